//! `/user/*` endpoints.

use crate::error::ApiError;
use crate::net::envelope::Page;
use crate::net::http::ApiClient;
use crate::net::types::{
    DeleteRequest, Id, LoginUser, UserAddRequest, UserLoginRequest, UserQueryRequest, UserRegisterRequest,
    UserUpdateRequest, UserVo,
};
use crate::state::session::SessionSource;

/// Session check endpoint; exempt from the 40100 redirect policy.
pub const GET_LOGIN_USER_PATH: &str = "/user/get/login";

/// `POST /user/login`
///
/// # Errors
///
/// Returns the backend's rejection (bad credentials) or a transport failure.
pub async fn user_login(client: &ApiClient, body: &UserLoginRequest) -> Result<LoginUser, ApiError> {
    client.post_data::<_, LoginUser>("/user/login", body).await
}

/// `POST /user/register`, returning the new user id.
///
/// # Errors
///
/// Returns validation errors from the backend or a transport failure.
pub async fn user_register(client: &ApiClient, body: &UserRegisterRequest) -> Result<Id, ApiError> {
    client.post_data::<_, Id>("/user/register", body).await
}

/// `GET /user/get/login`
///
/// # Errors
///
/// Returns `AuthExpired` when no session exists, or a transport failure.
pub async fn get_login_user(client: &ApiClient) -> Result<LoginUser, ApiError> {
    client.get_data::<LoginUser>(GET_LOGIN_USER_PATH, Vec::new()).await
}

/// `POST /user/logout`
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn user_logout(client: &ApiClient) -> Result<bool, ApiError> {
    client.post_empty_data::<bool>("/user/logout").await
}

/// `POST /user/list/page/vo` (admin)
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn list_user_vo_by_page(client: &ApiClient, body: &UserQueryRequest) -> Result<Page<UserVo>, ApiError> {
    client.post_data::<_, Page<UserVo>>("/user/list/page/vo", body).await
}

/// `POST /user/add` (admin), returning the new user id.
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn add_user(client: &ApiClient, body: &UserAddRequest) -> Result<Id, ApiError> {
    client.post_data::<_, Id>("/user/add", body).await
}

/// `POST /user/update` (admin)
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn update_user(client: &ApiClient, body: &UserUpdateRequest) -> Result<bool, ApiError> {
    client.post_data::<_, bool>("/user/update", body).await
}

/// `POST /user/delete` (admin)
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn delete_user(client: &ApiClient, body: &DeleteRequest) -> Result<bool, ApiError> {
    client.post_data::<_, bool>("/user/delete", body).await
}

#[async_trait::async_trait]
impl SessionSource for ApiClient {
    async fn fetch_login_user(&self) -> Result<LoginUser, ApiError> {
        get_login_user(self).await
    }

    async fn login(&self, request: &UserLoginRequest) -> Result<LoginUser, ApiError> {
        user_login(self, request).await
    }

    async fn logout(&self) -> Result<bool, ApiError> {
        user_logout(self).await
    }
}
