pub mod calculations;
pub mod extract;
pub mod health;
pub mod users;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub use calculations::{
    add_calculation, browse_calculations, delete_calculation, edit_calculation,
    read_calculation, replace_calculation,
};
pub use health::health_check;
pub use users::{current_user, login_user, logout_user, refresh_token, register_user};

/// Every route of the service; layers (CORS, tracing) are added by the caller
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/users/register", post(register_user))
        .route("/users/login", post(login_user))
        .route("/users/token/refresh", post(refresh_token))
        .route("/users/logout", post(logout_user))
        .route("/users/me", get(current_user))
        .route(
            "/calculations",
            get(browse_calculations).post(add_calculation),
        )
        .route(
            "/calculations/:id",
            get(read_calculation)
                .put(replace_calculation)
                .patch(edit_calculation)
                .delete(delete_calculation),
        )
        .with_state(state)
}
