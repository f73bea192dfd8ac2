//! # Authorization rules
//!
//! Pure predicates over users and resources. Two principles drive the
//! shape of these functions:
//!
//! - **Existence before scope**: a missing resource is `NotFound`; an
//!   existing resource outside the actor's company, or hidden by its
//!   access type, is `Forbidden`.
//! - **Privileged override**: admin, director and senior see every
//!   resource of the company regardless of the per-resource access type.

use crate::{
    DomainError,
    company::CompanyId,
    user::{Role, User},
    value_objects::AccessType,
    user::UserId,
};

/// Scope check: the resource must belong to the actor's company.
/// Admin passes.
pub fn ensure_same_company(
    actor: &User,
    resource_company_id: &CompanyId,
) -> Result<(), DomainError> {
    if actor.is_admin() {
        return Ok(());
    }
    if actor.company_id() == Some(resource_company_id) {
        return Ok(());
    }
    Err(DomainError::Forbidden(
        "Ресурс принадлежит другой компании".to_string(),
    ))
}

/// Scope check for resources shared between two companies
/// (certificates, cross-company tasks).
pub fn ensure_company_involved(actor: &User, involved: bool) -> Result<(), DomainError> {
    if actor.is_admin() || involved {
        return Ok(());
    }
    Err(DomainError::Forbidden(
        "Ресурс принадлежит другой компании".to_string(),
    ))
}

/// Visibility of a restricted resource (client, folder) for an actor
/// already known to be in the owning company.
pub fn can_view_restricted(
    actor: &User,
    owner_id: &UserId,
    access_type: AccessType,
    allowed_user_ids: &[UserId],
) -> bool {
    if actor.role().is_privileged() || actor.id() == owner_id {
        return true;
    }
    match access_type {
        AccessType::Public => true,
        AccessType::Private => false,
        AccessType::Selected => allowed_user_ids.contains(actor.id()),
    }
}

/// Same as [`can_view_restricted`], as a `Forbidden` result. Assumes
/// the same-company check already passed.
pub fn ensure_can_view_restricted(
    actor: &User,
    owner_id: &UserId,
    access_type: AccessType,
    allowed_user_ids: &[UserId],
) -> Result<(), DomainError> {
    if can_view_restricted(actor, owner_id, access_type, allowed_user_ids) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Нет доступа к этому ресурсу".to_string(),
        ))
    }
}

/// Mutation of an owned resource: the owner or a privileged role.
pub fn ensure_owner_or_privileged(actor: &User, owner_id: &UserId) -> Result<(), DomainError> {
    if actor.id() == owner_id || actor.role().is_privileged() {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Изменять ресурс может только владелец или руководитель".to_string(),
        ))
    }
}

/// Director or senior of their own company (or admin). Gate for
/// redirects, partnerships and member management.
pub fn ensure_privileged(actor: &User) -> Result<(), DomainError> {
    if actor.role().is_privileged() {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Требуется роль директора или старшего сотрудника".to_string(),
        ))
    }
}

pub fn ensure_admin(actor: &User) -> Result<(), DomainError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Требуются права администратора".to_string(),
        ))
    }
}

/// Whether `actor` may block, unblock, remove or change the role of
/// `target`.
///
/// Admin acts on anyone but another admin. Directors and seniors act on
/// strictly lower-ranked members of their own company.
pub fn can_manage_member(actor: &User, target: &User) -> bool {
    if actor.id() == target.id() {
        return false;
    }
    if actor.is_admin() {
        return target.role() != Role::Admin;
    }
    if !actor.role().is_privileged() {
        return false;
    }
    let same_company =
        actor.company_id().is_some() && actor.company_id() == target.company_id();
    same_company && actor.role().rank() > target.role().rank()
}

pub fn ensure_can_manage_member(actor: &User, target: &User) -> Result<(), DomainError> {
    if can_manage_member(actor, target) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Недостаточно прав для управления этим пользователем".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::{
        user::UserId,
        value_objects::{ActivityType, Email},
    };

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn user_with_role(role: Role, company_id: Option<CompanyId>) -> User {
        let base = User::new(
            UserId::new(),
            Email::new(format!("{}@example.com", uuid::Uuid::new_v4())).unwrap(),
            "hash".to_string(),
            "Тестовый Пользователь".to_string(),
            String::new(),
            ActivityType::Declarant,
            now(),
        )
        .unwrap();
        let base = match company_id {
            Some(id) => base.with_company(id, now()),
            None => base,
        };
        base.with_role(role, now())
    }

    #[fixture]
    fn company() -> CompanyId {
        CompanyId::new()
    }

    // ensure_same_company

    #[rstest]
    fn test_same_company_passes(company: CompanyId) {
        let actor = user_with_role(Role::Employee, Some(company));
        assert!(ensure_same_company(&actor, &company).is_ok());
    }

    #[rstest]
    fn test_foreign_company_is_forbidden(company: CompanyId) {
        let actor = user_with_role(Role::Director, Some(company));
        let err = ensure_same_company(&actor, &CompanyId::new()).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[rstest]
    fn test_admin_passes_any_company() {
        let admin = user_with_role(Role::Admin, None);
        assert!(ensure_same_company(&admin, &CompanyId::new()).is_ok());
    }

    // can_view_restricted

    #[rstest]
    #[case(AccessType::Private, false)]
    #[case(AccessType::Public, true)]
    fn test_employee_visibility_by_access_type(
        company: CompanyId,
        #[case] access_type: AccessType,
        #[case] expected: bool,
    ) {
        let employee = user_with_role(Role::Employee, Some(company));
        let owner = UserId::new();
        assert_eq!(
            can_view_restricted(&employee, &owner, access_type, &[]),
            expected
        );
    }

    #[rstest]
    fn test_selected_requires_membership(company: CompanyId) {
        let employee = user_with_role(Role::Employee, Some(company));
        let owner = UserId::new();

        assert!(!can_view_restricted(&employee, &owner, AccessType::Selected, &[]));
        assert!(can_view_restricted(
            &employee,
            &owner,
            AccessType::Selected,
            &[*employee.id()],
        ));
    }

    #[rstest]
    fn test_owner_always_sees_own_resource(company: CompanyId) {
        let employee = user_with_role(Role::Employee, Some(company));
        let owner_id = *employee.id();
        assert!(can_view_restricted(&employee, &owner_id, AccessType::Private, &[]));
    }

    #[rstest]
    #[case(Role::Director)]
    #[case(Role::Senior)]
    fn test_privileged_roles_override_private(company: CompanyId, #[case] role: Role) {
        let actor = user_with_role(role, Some(company));
        let owner = UserId::new();
        assert!(can_view_restricted(&actor, &owner, AccessType::Private, &[]));
    }

    // can_manage_member

    #[rstest]
    fn test_director_manages_employee_of_own_company(company: CompanyId) {
        let director = user_with_role(Role::Director, Some(company));
        let employee = user_with_role(Role::Employee, Some(company));
        assert!(can_manage_member(&director, &employee));
    }

    #[rstest]
    fn test_director_cannot_manage_other_director(company: CompanyId) {
        let director = user_with_role(Role::Director, Some(company));
        let other = user_with_role(Role::Director, Some(company));
        assert!(!can_manage_member(&director, &other));
    }

    #[rstest]
    fn test_director_cannot_manage_foreign_employee(company: CompanyId) {
        let director = user_with_role(Role::Director, Some(company));
        let foreign = user_with_role(Role::Employee, Some(CompanyId::new()));
        assert!(!can_manage_member(&director, &foreign));
    }

    #[rstest]
    fn test_senior_cannot_manage_senior(company: CompanyId) {
        let senior = user_with_role(Role::Senior, Some(company));
        let other = user_with_role(Role::Senior, Some(company));
        assert!(!can_manage_member(&senior, &other));
    }

    #[rstest]
    fn test_admin_manages_anyone_but_admin() {
        let admin = user_with_role(Role::Admin, None);
        let director = user_with_role(Role::Director, Some(CompanyId::new()));
        let other_admin = user_with_role(Role::Admin, None);

        assert!(can_manage_member(&admin, &director));
        assert!(!can_manage_member(&admin, &other_admin));
    }

    #[rstest]
    fn test_nobody_manages_self(company: CompanyId) {
        let director = user_with_role(Role::Director, Some(company));
        assert!(!can_manage_member(&director, &director));
    }

    #[rstest]
    fn test_employee_is_not_privileged(company: CompanyId) {
        let employee = user_with_role(Role::Employee, Some(company));
        assert!(ensure_privileged(&employee).is_err());
    }
}
