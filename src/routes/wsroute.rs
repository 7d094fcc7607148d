use crate::error::AppError;
use crate::middleware::guards::bearer_token;
use crate::services::{AuthUser, ChatRelay};
use crate::state::AppState;
use crate::websocket::message_types::{WsInboundEvent, WsOutboundEvent};
use crate::websocket::{ConnectionId, PresenceRegistry};
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

// WebSocket Actor
struct WsSession {
    user: AuthUser,
    connection: ConnectionId,
    registry: PresenceRegistry,
    relay: ChatRelay,
    // frames pushed through the registry; moved into the actor stream on start
    outbound: Option<UnboundedReceiver<String>>,
    hb: Instant,
}

impl WsSession {
    fn new(
        user: AuthUser,
        connection: ConnectionId,
        outbound: UnboundedReceiver<String>,
        state: &AppState,
    ) -> Self {
        Self {
            user,
            connection,
            registry: state.registry.clone(),
            relay: state.relay.clone(),
            outbound: Some(outbound),
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(user_id = %act.user.identity, "WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn handle_event(&self, evt: WsInboundEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match evt {
            WsInboundEvent::Ping => match WsOutboundEvent::Pong.to_frame() {
                Ok(frame) => ctx.text(frame),
                Err(e) => tracing::error!(error = %e, "failed to encode pong"),
            },

            WsInboundEvent::Typing { receiver_id } => {
                if receiver_id == self.user.identity {
                    return;
                }
                let relay = self.relay.clone();
                let sender_id = self.user.identity.clone();
                actix::spawn(async move {
                    relay.notify_typing(&sender_id, &receiver_id).await;
                });
            }

            WsInboundEvent::Unknown => {
                tracing::debug!(user_id = %self.user.identity, "ignoring unknown WS frame type");
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            user_id = %self.user.identity,
            connection = ?self.connection,
            "WebSocket session started"
        );

        self.hb(ctx);

        if let Some(rx) = self.outbound.take() {
            ctx.add_stream(UnboundedReceiverStream::new(rx));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            user_id = %self.user.identity,
            connection = ?self.connection,
            "WebSocket session stopped"
        );

        let registry = self.registry.clone();
        let user_id = self.user.identity.clone();
        let connection = self.connection;
        actix::spawn(async move {
            registry.deregister(&user_id, connection).await;
        });
    }
}

// Frames pushed to this user through the presence registry
impl StreamHandler<String> for WsSession {
    fn handle(&mut self, frame: String, ctx: &mut Self::Context) {
        ctx.text(frame);
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        // channel closed: superseded by a newer connection or dropped after a failed push
        tracing::info!(user_id = %self.user.identity, "outbound channel closed, ending session");
        ctx.close(Some(ws::CloseCode::Policy.into()));
        ctx.stop();
    }
}

// Handle WebSocket protocol messages
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                match serde_json::from_str::<WsInboundEvent>(&text) {
                    Ok(evt) => self.handle_event(evt, ctx),
                    Err(e) => {
                        tracing::warn!(user_id = %self.user.identity, error = %e, "Failed to parse WS message");
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(?reason, "WebSocket close message received");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(user_id = %self.user.identity, error = %e, "WebSocket protocol error");
                ctx.stop();
            }
        }
    }
}

// HTTP handler
#[get("/ws/chat")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let token = query
        .into_inner()
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&req));

    let Some(token) = token else {
        tracing::warn!("WebSocket connection rejected: no token provided");
        return Err(AppError::MissingToken.into());
    };

    let user = state.relay.authenticate(&token).await.map_err(|e| {
        tracing::warn!("WebSocket connection rejected: invalid token");
        e
    })?;

    // Reject non-upgrade requests before touching presence
    ws::handshake(&req)?;

    let user_id = user.identity.clone();
    let (connection, rx) = state.registry.register(&user_id).await;
    let session = WsSession::new(user, connection, rx, &state);

    match ws::start(session, &req, stream) {
        Ok(resp) => Ok(resp),
        Err(e) => {
            state.registry.deregister(&user_id, connection).await;
            Err(e)
        }
    }
}
