use super::Lobby;
use crate::control;
use crate::session::SocketClient;
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::web;
use actix_web::App;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use std::sync::Arc;
use std::time::Duration;

pub struct Server;

impl Server {
    pub async fn run() -> Result<(), std::io::Error> {
        let state = web::Data::from(Lobby::new());
        log::info!("starting hosting server");
        HttpServer::new(move || {
            App::new()
                .wrap(Logger::new("%r %s %Ts"))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header(),
                )
                .app_data(state.clone())
                .route("/health", web::get().to(health))
                .route("/", web::get().to(connect))
        })
        .workers(4)
        .bind(std::env::var("BIND_ADDR").expect("BIND_ADDR must be set"))?
        .run()
        .await
    }
}

async fn health() -> impl Responder {
    HttpResponse::Ok().body("OK")
}

async fn connect(lobby: web::Data<Lobby>, req: HttpRequest, body: web::Payload) -> HttpResponse {
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            bridge(lobby.into_inner(), session, stream);
            response
        }
        Err(error) => HttpResponse::InternalServerError().body(error.to_string()),
    }
}

/// Pump frames between the socket and the session's channels. Outbound
/// frames come from the session's flush task; inbound text is dispatched
/// in arrival order. Either side failing tears the connection down.
fn bridge(lobby: Arc<Lobby>, mut session: actix_ws::Session, mut stream: actix_ws::MessageStream) {
    actix_web::rt::spawn(async move {
        use futures::StreamExt;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let client = SocketClient::new(
            lobby.next_session(),
            tx,
            Duration::from_millis(crate::FLUSH_INTERVAL),
        );
        client.start_flush();
        lobby.subscribe(client.clone());
        log::info!("client {} connected", client.id);
        'sesh: loop {
            tokio::select! {
                biased;
                frame = rx.recv() => match frame {
                    Some(json) => if session.text(json).await.is_err() { break 'sesh },
                    None => break 'sesh,
                },
                msg = stream.next() => match msg {
                    Some(Ok(actix_ws::Message::Text(text))) => control::dispatch(&lobby, &client, &text).await,
                    Some(Ok(actix_ws::Message::Close(_))) => break 'sesh,
                    Some(Err(_)) => break 'sesh,
                    None => break 'sesh,
                    _ => continue 'sesh,
                },
            }
        }
        lobby.disconnect(&client).await;
    });
}
