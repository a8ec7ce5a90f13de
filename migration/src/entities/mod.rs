pub mod api_token;
pub mod authbundle;
pub mod ca_file;
pub mod device;
pub mod settings;
pub mod user;

pub use api_token::Entity as ApiTokenEntity;
pub use authbundle::Entity as AuthbundleEntity;
pub use ca_file::Entity as CaFileEntity;
pub use device::Entity as DeviceEntity;
pub use settings::Entity as SettingsEntity;
pub use user::Entity as UserEntity;
