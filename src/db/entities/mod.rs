//! SeaORM entities mapping the tables owned by this service.

pub mod credential;

pub mod prelude {
    pub use super::credential::ActiveModel as CredentialActiveModel;
    pub use super::credential::Column as CredentialColumn;
    pub use super::credential::Entity as Credential;
    pub use super::credential::Model as CredentialModel;
}
