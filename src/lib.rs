pub mod config;
pub mod error;
pub mod state;
pub mod db;
pub mod routes;

pub mod crypto {
    pub mod password;
    pub mod token;
}

pub mod models {
    pub mod user;
    pub mod claims;
}

pub mod repositories {
    pub mod user;
    pub mod memory;
}

pub mod services {
    pub mod auth;
    pub mod verifier;
}

pub mod handlers {
    pub mod auth;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}

pub mod client {
    pub mod session;
}
