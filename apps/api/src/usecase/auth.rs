//! # Account usecase
//!
//! Registration, login and profile management. Company membership is
//! not granted here: a new account starts detached and joins a company
//! through the request flow.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use declarant_domain::{
    DomainError,
    user::{User, UserId},
    value_objects::{ActivityType, Email},
};
use declarant_infra::{
    PasswordHasher, TransactionManager, admin_code::AdminCodeCache,
    repository::{CompanyRepository, UserRepository},
};

use crate::{
    error::ApiError,
    usecase::{begin_tx, commit_tx},
};

pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    pub activity_type: ActivityType,
}

pub struct UpdateProfileInput {
    pub full_name: String,
    pub phone: String,
}

pub struct AuthUseCase<TM, U, C> {
    tx_manager: TM,
    user_repo: U,
    company_repo: C,
    hasher: Arc<dyn PasswordHasher>,
    admin_login: String,
    admin_password: String,
    admin_codes: Arc<AdminCodeCache>,
}

impl<TM, U, C> AuthUseCase<TM, U, C>
where
    TM: TransactionManager,
    U: UserRepository,
    C: CompanyRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tx_manager: TM,
        user_repo: U,
        company_repo: C,
        hasher: Arc<dyn PasswordHasher>,
        admin_login: String,
        admin_password: String,
        admin_codes: Arc<AdminCodeCache>,
    ) -> Self {
        Self {
            tx_manager,
            user_repo,
            company_repo,
            hasher,
            admin_login,
            admin_password,
            admin_codes,
        }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<User, ApiError> {
        let email = Email::new(input.email)?;
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict(
                "Пользователь с таким email уже существует".to_string(),
            )
            .into());
        }

        let password_hash = self.hasher.hash(&input.password)?;
        let user = User::new(
            UserId::new(),
            email,
            password_hash,
            input.full_name,
            input.phone,
            input.activity_type,
            Utc::now(),
        )?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.user_repo.insert(&mut tx, &user).await?;
        commit_tx(tx).await?;

        Ok(user)
    }

    /// Credential check plus block checks, for both the user and their
    /// company. The caller mints the token.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let email = Email::new(email)?;
        let Some(user) = self.user_repo.find_by_email(&email).await? else {
            return Err(invalid_credentials());
        };
        if !self.hasher.verify(password, user.password_hash())? {
            return Err(invalid_credentials());
        }
        ensure_not_blocked(&self.company_repo, &user).await?;

        Ok(user)
    }

    /// Admin login: configured credential pair plus the one-time code
    /// printed at startup.
    pub async fn admin_login(
        &self,
        login: &str,
        password: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<User, ApiError> {
        if login != self.admin_login || password != self.admin_password {
            return Err(invalid_credentials());
        }
        if !self.admin_codes.verify_and_consume(code, now) {
            return Err(DomainError::Forbidden(
                "Неверный или истекший одноразовый код".to_string(),
            )
            .into());
        }
        let admin = self
            .user_repo
            .find_admin()
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity_type: "Администратор",
                id: self.admin_login.clone(),
            })?;

        Ok(admin)
    }

    pub async fn update_profile(
        &self,
        actor: User,
        input: UpdateProfileInput,
    ) -> Result<User, ApiError> {
        let updated = actor.with_profile(input.full_name, input.phone, Utc::now())?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.user_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    pub async fn change_password(
        &self,
        actor: User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        if !self.hasher.verify(current_password, actor.password_hash())? {
            return Err(DomainError::Forbidden("Неверный текущий пароль".to_string()).into());
        }
        let updated = actor.with_password_hash(self.hasher.hash(new_password)?, Utc::now());

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.user_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(())
    }

    pub async fn set_avatar(&self, actor: User, avatar_url: String) -> Result<User, ApiError> {
        let updated = actor.with_avatar(avatar_url, Utc::now());

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.user_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    /// Links or unlinks the Telegram chat used for the side channel.
    pub async fn set_telegram_chat(
        &self,
        actor: User,
        chat_id: Option<String>,
    ) -> Result<User, ApiError> {
        let updated = actor.with_telegram_chat_id(chat_id, Utc::now());

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.user_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }
}

fn invalid_credentials() -> ApiError {
    DomainError::Forbidden("Неверный email или пароль".to_string()).into()
}

/// Shared by login and the request extractor: a blocked user, or any
/// user of a blocked company, is rejected.
pub async fn ensure_not_blocked<C: CompanyRepository>(
    company_repo: &C,
    user: &User,
) -> Result<(), ApiError> {
    if !user.can_login() {
        return Err(DomainError::Forbidden("Пользователь заблокирован".to_string()).into());
    }
    if let Some(company_id) = user.company_id() {
        let company = company_repo.find_by_id(company_id).await?;
        if company.is_some_and(|c| c.is_blocked()) {
            return Err(DomainError::Forbidden("Компания заблокирована".to_string()).into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use declarant_domain::user::Role;
    use declarant_infra::mock::{
        MockCompanyRepository, MockTransactionManager, MockUserRepository,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    /// Reversal "hash" keeps the tests fast; real hashing is covered in
    /// the infra crate.
    struct FakeHasher;

    impl PasswordHasher for FakeHasher {
        fn hash(&self, password: &str) -> Result<String, declarant_infra::InfraError> {
            Ok(password.chars().rev().collect())
        }

        fn verify(
            &self,
            password: &str,
            hash: &str,
        ) -> Result<bool, declarant_infra::InfraError> {
            Ok(password.chars().rev().collect::<String>() == hash)
        }
    }

    type TestUseCase =
        AuthUseCase<MockTransactionManager, MockUserRepository, MockCompanyRepository>;

    #[fixture]
    fn usecase() -> (TestUseCase, MockUserRepository, MockCompanyRepository) {
        let user_repo = MockUserRepository::new();
        let company_repo = MockCompanyRepository::new();
        let usecase = AuthUseCase::new(
            MockTransactionManager,
            user_repo.clone(),
            company_repo.clone(),
            Arc::new(FakeHasher),
            "admin".to_string(),
            "admin-password".to_string(),
            Arc::new(AdminCodeCache::new()),
        );
        (usecase, user_repo, company_repo)
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: "secret".to_string(),
            full_name: "Иванов Иван".to_string(),
            phone: "+992900000000".to_string(),
            activity_type: ActivityType::Declarant,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_register_then_login(
        usecase: (TestUseCase, MockUserRepository, MockCompanyRepository),
    ) {
        let (usecase, _, _) = usecase;
        let user = usecase.register(register_input("user@example.com")).await.unwrap();
        assert_eq!(user.role(), Role::Employee);
        assert_eq!(user.company_id(), None);

        let logged_in = usecase.login("user@example.com", "secret").await.unwrap();
        assert_eq!(logged_in.id(), user.id());
    }

    #[rstest]
    #[tokio::test]
    async fn test_register_rejects_duplicate_email(
        usecase: (TestUseCase, MockUserRepository, MockCompanyRepository),
    ) {
        let (usecase, _, _) = usecase;
        usecase.register(register_input("user@example.com")).await.unwrap();

        let result = usecase.register(register_input("user@example.com")).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_login_rejects_wrong_password(
        usecase: (TestUseCase, MockUserRepository, MockCompanyRepository),
    ) {
        let (usecase, _, _) = usecase;
        usecase.register(register_input("user@example.com")).await.unwrap();

        let result = usecase.login("user@example.com", "wrong").await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_login_rejects_blocked_user(
        usecase: (TestUseCase, MockUserRepository, MockCompanyRepository),
    ) {
        let (usecase, user_repo, _) = usecase;
        let user = usecase.register(register_input("user@example.com")).await.unwrap();
        let mut tx = declarant_infra::db::TxContext::mock();
        user_repo
            .update(&mut tx, &user.with_blocked(true, Utc::now()))
            .await
            .unwrap();

        let result = usecase.login("user@example.com", "secret").await;
        assert!(result.is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn test_admin_login_consumes_code(
        usecase: (TestUseCase, MockUserRepository, MockCompanyRepository),
    ) {
        let (usecase, user_repo, _) = usecase;
        let admin = User::new(
            UserId::new(),
            Email::new("admin@platform.local").unwrap(),
            "hash".to_string(),
            "Администратор".to_string(),
            String::new(),
            ActivityType::Declarant,
            Utc::now(),
        )
        .unwrap()
        .with_role(Role::Admin, Utc::now());
        user_repo.add_user(admin);

        let code = usecase.admin_codes.issue(Utc::now());
        let logged_in = usecase
            .admin_login("admin", "admin-password", &code, Utc::now())
            .await
            .unwrap();
        assert!(logged_in.is_admin());

        // second use fails
        let result = usecase
            .admin_login("admin", "admin-password", &code, Utc::now())
            .await;
        assert!(result.is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn test_change_password_requires_current(
        usecase: (TestUseCase, MockUserRepository, MockCompanyRepository),
    ) {
        let (usecase, _, _) = usecase;
        let user = usecase.register(register_input("user@example.com")).await.unwrap();

        let result = usecase.change_password(user, "wrong", "next").await;
        assert!(result.is_err());
    }
}
