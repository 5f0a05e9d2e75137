//! Server-sent-event endpoints for live alert delivery.
//!
//! These routes sit outside the OpenAPI router: SSE responses do not fit
//! the JSON envelope, and the connection stays open until the client
//! leaves. Dropping the connection unsubscribes eagerly via the stream
//! guard; a missed drop is cleaned up by the broadcaster on the next
//! publish to the topic.

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::stream::{Stream, StreamExt};
use rackwatch_common::types::{TargetRef, TargetType};
use rackwatch_notify::{AlertBroadcaster, PushEvent, TOPIC_ALL};
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use utoipa::ToSchema;

use crate::api::{error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;

/// A topic subscription that unsubscribes itself when the SSE
/// connection is dropped.
struct TopicStream {
    inner: ReceiverStream<PushEvent>,
    broadcaster: Arc<AlertBroadcaster>,
    topic: String,
    id: u64,
}

impl Stream for TopicStream {
    type Item = PushEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl Drop for TopicStream {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(&self.topic, self.id);
    }
}

fn sse_for_topic(state: &AppState, topic: &str) -> Response {
    let subscription = state.broadcaster.subscribe(topic);
    let stream = TopicStream {
        inner: ReceiverStream::new(subscription.receiver),
        broadcaster: state.broadcaster.clone(),
        topic: subscription.topic,
        id: subscription.id,
    };
    let events = stream.map(|push| -> Result<Event, Infallible> {
        Ok(Event::default()
            .event(push.event.as_str())
            .json_data(&push.alert)
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to encode push event");
                Event::default().event("error").data("encoding failure")
            }))
    });
    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}

/// Live feed of every alert lifecycle event.
async fn stream_all(State(state): State<AppState>) -> Response {
    sse_for_topic(&state, TOPIC_ALL)
}

/// Live feed scoped to one target.
async fn stream_target(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path((raw_type, target_id)): Path<(String, String)>,
) -> Response {
    let target_type: TargetType = match raw_type.parse() {
        Ok(t) => t,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_target_type", &msg)
        }
    };
    let topic = TargetRef::new(target_type, &target_id).topic();
    sse_for_topic(&state, &topic)
}

/// 推送通道统计
#[derive(Serialize, ToSchema)]
struct StreamStats {
    /// 在线订阅总数
    total_subscribers: usize,
    /// 各主题订阅数
    topics: HashMap<String, usize>,
}

/// Subscriber counts, per topic and total.
async fn stream_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> Response {
    success_response(
        StatusCode::OK,
        &trace_id,
        StreamStats {
            total_subscribers: state.broadcaster.total_subscribers(),
            topics: state.broadcaster.topic_counts(),
        },
    )
}

pub fn stream_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/stream/alerts", get(stream_all))
        .route("/v1/stream/alerts/{target_type}/{target_id}", get(stream_target))
        .route("/v1/stream/stats", get(stream_stats))
}
