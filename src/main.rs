use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        error::AppError,
        repos::{CreateGroupParams, GroupsRepo},
    },
    cache::CacheConfig,
    config,
    domain::{
        error::DomainError,
        slug::{derive_slug, validate_slug},
    },
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, HttpOptions, HttpState},
        telemetry,
        uploads::UploadStorage,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CreateGroup(args) => run_create_group(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let upload_storage = Arc::new(
        UploadStorage::new(settings.uploads.directory.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );

    let options = HttpOptions {
        page_size: settings.feed.page_size,
        session_ttl: settings.session.ttl,
        cache: Some(CacheConfig::from(&settings.cache)),
    };
    let http_state = HttpState::new(repositories, upload_storage, options);

    serve_http(&settings, http_state).await
}

async fn run_create_group(
    settings: config::Settings,
    args: config::CreateGroupArgs,
) -> Result<(), AppError> {
    let title = args.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::validation("group title must not be empty"));
    }

    let slug = match args.slug.as_deref() {
        Some(explicit) => validate_slug(explicit),
        None => derive_slug(&title),
    }
    .map_err(|err| AppError::from(DomainError::validation(err.to_string())))?;

    let repositories = init_repositories(&settings).await?;
    let groups: Arc<dyn GroupsRepo> = repositories;
    let group = groups
        .create_group(CreateGroupParams {
            title,
            slug,
            description: args.description,
        })
        .await?;

    info!(
        target = "yatube::create_group",
        id = group.id,
        slug = %group.slug,
        "Group created"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<SqliteRepositories>, AppError> {
    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| AppError::from(InfraError::from(err)))?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(SqliteRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let body_limit = usize::try_from(settings.uploads.max_request_bytes.get())
        .map_err(|_| AppError::from(InfraError::configuration("upload limit exceeds usize")))?;
    let router = http::build_router(http_state, body_limit);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "yatube::serve",
        addr = %settings.server.addr,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
