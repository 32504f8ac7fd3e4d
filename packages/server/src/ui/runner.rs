//! Server assembly and lifecycle.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    domain::{
        CompletionNotifier, ConnectionRepository, JobQueue, MessageRepository, RoomRepository,
        TokenVerifier, TranslationRepository, Translator,
    },
    error::ServerError,
    infrastructure::{
        auth::JwtTokenVerifier,
        notifier::{HttpNotifier, NOTIFY_PATH},
        queue::InMemoryJobQueue,
        repository::{
            InMemoryConnectionRepository, InMemoryMessageRepository, InMemoryRoomRepository,
            InMemoryTranslationRepository,
        },
        translator::OpenAiTranslator,
    },
    usecase::{
        AuthenticateUseCase, ChangeLanguageUseCase, ConnectParticipantUseCase, CreateRoomUseCase,
        DEFAULT_MAX_ID_ATTEMPTS, DisconnectParticipantUseCase, GetMessageHistoryUseCase,
        JoinRoomUseCase, LeaveRoomUseCase, NotifyTranslationUseCase, ProcessTranslationUseCase,
        SendMessageUseCase, SetLanguageUseCase,
    },
};

use super::{
    handler::{
        enqueue_translation, failed_jobs, get_room_detail, get_room_messages, health_check,
        notify_translation, queue_status, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Timeout of a completion callback to a remote relay
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the server needs besides the listener
struct Services {
    state: Arc<AppState>,
    queue: Arc<InMemoryJobQueue>,
    worker: Arc<ProcessTranslationUseCase>,
}

/// Wire repositories, the job queue and use cases together
fn assemble(config: &Config, translator: Arc<dyn Translator>) -> Result<Services, ServerError> {
    config.validate()?;
    let job_options = config.job_options();

    let rooms: Arc<dyn RoomRepository> = Arc::new(InMemoryRoomRepository::new());
    let messages: Arc<dyn MessageRepository> = Arc::new(InMemoryMessageRepository::new());
    let translations: Arc<dyn TranslationRepository> =
        Arc::new(InMemoryTranslationRepository::new());
    let connections: Arc<dyn ConnectionRepository> =
        Arc::new(InMemoryConnectionRepository::new());
    let verifier: Arc<dyn TokenVerifier> = Arc::new(JwtTokenVerifier::new(&config.jwt_secret));

    let queue = Arc::new(InMemoryJobQueue::new(config.worker_concurrency as usize));
    let job_queue: Arc<dyn JobQueue> = queue.clone();

    let notify = Arc::new(NotifyTranslationUseCase::new(connections.clone()));
    let notifier: Arc<dyn CompletionNotifier> = match &config.notify_url {
        Some(url) => {
            tracing::info!("Finished translations will be posted to {}", url);
            Arc::new(HttpNotifier::new(url, NOTIFY_TIMEOUT)?)
        }
        None => notify.clone(),
    };
    let worker = Arc::new(ProcessTranslationUseCase::new(
        translations.clone(),
        translator,
        notifier,
        config.translate_timeout(),
    ));

    let state = Arc::new(AppState {
        authenticate: AuthenticateUseCase::new(verifier, connections.clone()),
        connect: ConnectParticipantUseCase::new(connections.clone(), config.default_language()?),
        disconnect: DisconnectParticipantUseCase::new(connections.clone()),
        create_room: CreateRoomUseCase::new(rooms.clone(), DEFAULT_MAX_ID_ATTEMPTS),
        join_room: JoinRoomUseCase::new(
            rooms.clone(),
            messages.clone(),
            translations.clone(),
            connections.clone(),
            job_queue.clone(),
            job_options,
            config.recent_limit,
        ),
        leave_room: LeaveRoomUseCase::new(connections.clone()),
        set_language: SetLanguageUseCase::new(connections.clone()),
        change_language: ChangeLanguageUseCase::new(
            messages.clone(),
            translations.clone(),
            connections.clone(),
            job_queue.clone(),
            job_options,
        ),
        send_message: SendMessageUseCase::new(
            messages.clone(),
            connections.clone(),
            job_queue.clone(),
            job_options,
        ),
        history: GetMessageHistoryUseCase::new(
            rooms.clone(),
            messages,
            translations,
            connections.clone(),
        ),
        notify_translation: notify,
        rooms,
        connections,
        queue: job_queue,
        job_options,
        auth_grace: config.auth_grace(),
    });

    Ok(Services {
        state,
        queue,
        worker,
    })
}

/// Routes of the relay
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/rooms/{room_id}", get(get_room_detail))
        .route("/chat/{room_id}/messages", get(get_room_messages))
        .route(NOTIFY_PATH, post(notify_translation))
        .route("/translation/queue", post(enqueue_translation))
        .route("/translation/queue/status", get(queue_status))
        .route("/translation/queue/failed", get(failed_jobs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves, then drain the job queue dispatcher
pub async fn serve<F>(
    listener: TcpListener,
    config: &Config,
    translator: Arc<dyn Translator>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let services = assemble(config, translator)?;
    let dispatcher = services.queue.start(services.worker.clone()).await?;
    let app = build_router(services.state.clone());

    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    services.queue.close();
    if let Err(e) = dispatcher.await {
        tracing::warn!("Job queue dispatcher ended abnormally: {}", e);
    }
    tracing::info!("Server stopped");
    Ok(())
}

/// Run the relay with the OpenAI-compatible translator until a shutdown signal
pub async fn run(config: Config) -> Result<(), ServerError> {
    config.validate()?;
    if config.openai_api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set; translation requests will likely be rejected");
    }

    let translator: Arc<dyn Translator> = Arc::new(OpenAiTranslator::new(
        &config.translator_url,
        config.openai_api_key.clone(),
        config.translator_model.clone(),
        config.translate_timeout(),
    )?);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    serve(listener, &config, translator, shutdown_signal()).await
}
