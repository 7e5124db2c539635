pub mod google;
pub mod normalize;
mod oauth;
mod registry;
pub mod yandex;

pub use google::GoogleProvider;
pub use normalize::{CanonicalIdentity, GoogleUserInfo, ProviderPayload, YandexUserInfo, normalize};
pub use oauth::OAuthClient;
pub use registry::{IdentityProvider, IdentityProviders, ProviderId};
pub use yandex::YandexProvider;
