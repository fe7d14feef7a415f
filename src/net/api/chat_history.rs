//! `/chatHistory/*` endpoints.

use crate::error::ApiError;
use crate::net::envelope::Page;
use crate::net::http::ApiClient;
use crate::net::types::{ChatHistory, ChatHistoryCursor, ChatHistoryQueryRequest, Id};

/// `GET /chatHistory/app/{appId}?pageSize=&lastCreateTime=`
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn list_app_chat_history(
    client: &ApiClient,
    app_id: Id,
    cursor: &ChatHistoryCursor,
) -> Result<Page<ChatHistory>, ApiError> {
    client.get_data::<Page<ChatHistory>>(&format!("/chatHistory/app/{app_id}"), cursor.to_query()).await
}

/// `POST /chatHistory/admin/list/page/vo` (admin)
///
/// # Errors
///
/// Returns the backend's rejection or a transport failure.
pub async fn list_all_chat_history_by_page_for_admin(
    client: &ApiClient,
    body: &ChatHistoryQueryRequest,
) -> Result<Page<ChatHistory>, ApiError> {
    client.post_data::<_, Page<ChatHistory>>("/chatHistory/admin/list/page/vo", body).await
}
