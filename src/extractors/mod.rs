//! Request extractors and the principal-attachment seam.

mod principal;

pub use principal::{
    attach_principal, Authenticator, CurrentPrincipal, HeaderAuthenticator, PRINCIPAL_ID_HEADER,
    PRINCIPAL_ROLE_HEADER,
};
