//! `/app/*` endpoints, including the binary download and the chat stream.

use crate::error::ApiError;
use crate::net::envelope::Page;
use crate::net::http::ApiClient;
use crate::net::sse::ChatStream;
use crate::net::types::{
    AppAddRequest, AppAdminUpdateRequest, AppCodeUpdateRequest, AppQueryRequest, AppUpdateRequest, AppVo,
    DeleteRequest, DownloadedFile, Id,
};

/// `POST /app/add`, returning the new app id.
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn add_app(client: &ApiClient, body: &AppAddRequest) -> Result<Id, ApiError> {
    client.post_data::<_, Id>("/app/add", body).await
}

/// `GET /app/get/vo?id=`
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn get_app_vo_by_id(client: &ApiClient, id: Id) -> Result<AppVo, ApiError> {
    client.get_data::<AppVo>("/app/get/vo", vec![("id".to_owned(), id.to_string())]).await
}

/// `GET /app/get/preview-path/{appId}`
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn get_preview_path(client: &ApiClient, app_id: Id) -> Result<String, ApiError> {
    client.get_data::<String>(&format!("/app/get/preview-path/{app_id}"), Vec::new()).await
}

/// `POST /app/my/list/page/vo`
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn list_my_app_vo_by_page(client: &ApiClient, body: &AppQueryRequest) -> Result<Page<AppVo>, ApiError> {
    client.post_data::<_, Page<AppVo>>("/app/my/list/page/vo", body).await
}

/// `POST /app/good/list/page/vo`
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn list_good_app_vo_by_page(client: &ApiClient, body: &AppQueryRequest) -> Result<Page<AppVo>, ApiError> {
    client.post_data::<_, Page<AppVo>>("/app/good/list/page/vo", body).await
}

/// `POST /app/update`
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn update_app(client: &ApiClient, body: &AppUpdateRequest) -> Result<bool, ApiError> {
    client.post_data::<_, bool>("/app/update", body).await
}

/// `POST /app/delete`
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn delete_app(client: &ApiClient, body: &DeleteRequest) -> Result<bool, ApiError> {
    client.post_data::<_, bool>("/app/delete", body).await
}

/// `POST /app/update/code`
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn update_app_code(client: &ApiClient, body: &AppCodeUpdateRequest) -> Result<bool, ApiError> {
    client.post_data::<_, bool>("/app/update/code", body).await
}

/// `GET /app/download/{appId}`; the body is returned byte-for-byte.
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn download_app_code(client: &ApiClient, app_id: Id) -> Result<DownloadedFile, ApiError> {
    client.download(&format!("/app/download/{app_id}"), Vec::new()).await
}

/// `GET /app/chat/gen/code?appId=&message=` as a server-sent-event stream.
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure opening the stream.
pub async fn chat_to_gen_code(client: &ApiClient, app_id: Id, message: &str) -> Result<ChatStream, ApiError> {
    let query = vec![("appId".to_owned(), app_id.to_string()), ("message".to_owned(), message.to_owned())];
    client.event_stream("/app/chat/gen/code", query).await
}

/// `POST /app/admin/list/page/vo` (admin)
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn list_app_vo_by_page_by_admin(
    client: &ApiClient,
    body: &AppQueryRequest,
) -> Result<Page<AppVo>, ApiError> {
    client.post_data::<_, Page<AppVo>>("/app/admin/list/page/vo", body).await
}

/// `POST /app/admin/update` (admin)
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn update_app_by_admin(client: &ApiClient, body: &AppAdminUpdateRequest) -> Result<bool, ApiError> {
    client.post_data::<_, bool>("/app/admin/update", body).await
}

/// `POST /app/admin/delete` (admin)
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn delete_app_by_admin(client: &ApiClient, body: &DeleteRequest) -> Result<bool, ApiError> {
    client.post_data::<_, bool>("/app/admin/delete", body).await
}
