use std::convert::Infallible;

use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::web::Bytes;
use actix_web::{web, HttpResponse};
use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, warn};
use tokio::sync::broadcast::{self, error::RecvError};

use super::AppState;
use crate::auth::AuthenticatedUser;
use crate::domain::actor::{Actor, Role};
use crate::domain::events::Channel;
use crate::realtime::RealtimeMessage;

/// Rooms a caller may listen on: their own user room, plus their store's
/// room when they are a vendor.
pub fn channels_for(actor: &Actor) -> Vec<Channel> {
    let mut channels = vec![Channel::User(actor.user_id)];
    if actor.is(Role::Vendor) {
        channels.push(Channel::Vendor(actor.user_id));
    }
    channels
}

pub fn sse_frame(message: &RealtimeMessage) -> Bytes {
    Bytes::from(format!("event: {}\ndata: {}\n\n", message.event, message.data))
}

fn room_stream(channel: Channel, rx: broadcast::Receiver<RealtimeMessage>) -> BoxStream<'static, Result<Bytes, Infallible>> {
    stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(message) => return Some((Ok(sse_frame(&message)), rx)),
                Err(RecvError::Lagged(missed)) => {
                    warn!("Subscriber on {channel} fell behind and missed {missed} message(s)");
                }
                Err(RecvError::Closed) => {
                    debug!("Room {channel} closed");
                    return None;
                }
            }
        }
    })
    .boxed()
}

/// GET /realtime/subscribe
///
/// Server-sent events for the caller's rooms. Each frame is
/// `event: <name>` followed by `data: <json>`.
#[utoipa::path(
    get,
    path = "/realtime/subscribe",
    params(("access_token" = Option<String>, Query, description = "Bearer token for clients that cannot set headers")),
    responses((status = 200, description = "Event stream", content_type = "text/event-stream")),
    tag = "realtime"
)]
pub async fn subscribe(state: web::Data<AppState>, user: AuthenticatedUser) -> HttpResponse {
    let rooms: Vec<_> = channels_for(&user.0)
        .into_iter()
        .map(|channel| room_stream(channel, state.realtime.join(channel)))
        .collect();
    debug!("{} subscribed to {} room(s)", user.0.user_id, rooms.len());

    let hello = stream::once(async { Ok::<_, Infallible>(Bytes::from_static(b": connected\n\n")) });
    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .streaming(hello.chain(stream::select_all(rooms)))
}
