use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use zerocode_client::config::{ConfigError, DEFAULT_LOG_FILTER, DIAGNOSTIC_LOG_FILTER};
use zerocode_client::net::api::{app, chat_history, user};
use zerocode_client::net::types::{
    AppAddRequest, AppAdminUpdateRequest, AppCodeUpdateRequest, AppQueryRequest, AppUpdateRequest, ChatHistoryCursor,
    ChatHistoryQueryRequest, DeleteRequest, Id, UserAddRequest, UserLoginRequest, UserQueryRequest,
    UserRegisterRequest, UserRole, UserUpdateRequest,
};
use zerocode_client::{
    ApiClient, ApiError, ClientConfig, HeadlessNavigator, NavigationGuard, Navigator, Notifier, SessionStore, telemetry,
};


const USER_MANAGE_ROUTE: &str = "/admin/userManage";
const APP_MANAGE_ROUTE: &str = "/admin/appManage";
const CHAT_MANAGE_ROUTE: &str = "/admin/chatManage";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{path} requires a different role; guard redirected to {redirect}")]
    Denied { path: String, redirect: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "zerocode", about = "Zero-code app platform CLI")]
struct Cli {
    #[arg(long, env = "ZEROCODE_API_BASE_URL")]
    base_url: Option<String>,

    /// `Cookie` header value printed by a previous `login`.
    #[arg(long, env = "ZEROCODE_SESSION_COOKIE")]
    session_cookie: Option<String>,

    /// Log every request and response.
    #[arg(long, default_value_t = false)]
    diagnostics: bool,

    /// In-app location the command runs from; used as the login return URL.
    #[arg(long, default_value = "/")]
    location: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current session.
    Whoami,
    Login {
        #[arg(long)]
        account: String,
        #[arg(long, env = "ZEROCODE_PASSWORD")]
        password: String,
    },
    Logout,
    Register {
        #[arg(long)]
        account: String,
        #[arg(long, env = "ZEROCODE_PASSWORD")]
        password: String,
        /// Defaults to `--password`.
        #[arg(long)]
        check_password: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Navigate to an in-app path through the route guard.
    Visit { path: String },
    User(UserCommand),
    App(AppCommand),
    History(HistoryCommand),
}

#[derive(Args, Debug)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: u64,
    #[arg(long, default_value_t = 10)]
    size: u64,
}

#[derive(Args, Debug)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Subcommand, Debug)]
enum UserSubcommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        role: Option<UserRole>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        account: String,
        #[arg(long, default_value = "user")]
        role: UserRole,
    },
    Update {
        id: Id,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<UserRole>,
    },
    Delete {
        id: Id,
    },
}

#[derive(Args, Debug)]
struct AppCommand {
    #[command(subcommand)]
    command: AppSubcommand,
}

#[derive(Subcommand, Debug)]
enum AppSubcommand {
    Create {
        prompt: String,
    },
    Get {
        id: Id,
    },
    Preview {
        id: Id,
    },
    Mine {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        name: Option<String>,
    },
    Good {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        name: Option<String>,
    },
    Rename {
        id: Id,
        name: String,
    },
    Delete {
        id: Id,
    },
    UpdateCode {
        id: Id,
        /// File whose content replaces the generated code.
        #[arg(long)]
        file: PathBuf,
    },
    Download {
        id: Id,
        /// Defaults to the server-supplied file name.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Send one chat turn and stream the generated code to stdout.
    Chat {
        id: Id,
        message: String,
    },
    AdminList {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        user_id: Option<Id>,
    },
    AdminUpdate {
        id: Id,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
    },
    AdminDelete {
        id: Id,
    },
}

#[derive(Args, Debug)]
struct HistoryCommand {
    #[command(subcommand)]
    command: HistorySubcommand,
}

#[derive(Subcommand, Debug)]
enum HistorySubcommand {
    /// Newest messages of one app, paged by creation time.
    App {
        id: Id,
        #[arg(long, default_value_t = 10)]
        page_size: u64,
        /// Only messages older than this `createTime`.
        #[arg(long)]
        before: Option<String>,
    },
    Admin {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        app_id: Option<Id>,
        #[arg(long)]
        user_id: Option<Id>,
        #[arg(long)]
        message_type: Option<String>,
    },
}

struct CliContext {
    client: ApiClient,
    store: SessionStore,
    guard: NavigationGuard,
    navigator: Arc<HeadlessNavigator>,
}

/// Prints session warnings where a browser would show a toast.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn warning(&self, message: &str) {
        eprintln!("warning: {message}");
    }
}

/// Exit status after the session expired and the login redirect was issued.
const EXIT_SESSION_EXPIRED: u8 = 3;

/// How a finished command is reported to the shell.
#[derive(Debug)]
enum Outcome {
    Success,
    /// The 40100 policy already warned and redirected; nothing else to print.
    SessionExpired,
    Failed(CliError),
}

impl Outcome {
    fn classify(result: Result<(), CliError>, redirected: bool) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(CliError::Api(e)) if e.is_auth_expired() && redirected => Self::SessionExpired,
            Err(e) => Self::Failed(e),
        }
    }

    /// Print what the shell user still needs to see and return the exit status.
    fn report(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::SessionExpired => EXIT_SESSION_EXPIRED,
            Self::Failed(e) => {
                eprintln!("error: {e}");
                1
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    let cli = Cli::parse();
    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => return ExitCode::from(Outcome::Failed(e).report()),
    };
    telemetry::init(&config);

    let ctx = match build_context(&config, &cli.location) {
        Ok(ctx) => ctx,
        Err(e) => return ExitCode::from(Outcome::Failed(e).report()),
    };
    let result = run(&ctx, cli.command).await;
    let redirects = ctx.navigator.redirects();
    for href in &redirects {
        eprintln!("redirected to {href}");
    }
    ExitCode::from(Outcome::classify(result, !redirects.is_empty()).report())
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => eprintln!("warning: ignoring .env: {e}"),
    }
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(cookie) = &cli.session_cookie {
        config.session_cookie = Some(cookie.clone()).filter(|c| !c.trim().is_empty());
    }
    if cli.diagnostics && !config.diagnostics {
        config.diagnostics = true;
        if config.log_filter == DEFAULT_LOG_FILTER {
            DIAGNOSTIC_LOG_FILTER.clone_into(&mut config.log_filter);
        }
    }
    Ok(config)
}

fn build_context(config: &ClientConfig, location: &str) -> Result<CliContext, CliError> {
    let navigator = Arc::new(HeadlessNavigator::new(location));
    let client = ApiClient::new(config)?.with_session_expiry(
        navigator.clone(),
        Arc::new(StderrNotifier),
        config.login_path.clone(),
    );
    let store = SessionStore::new(Arc::new(client.clone()));
    let guard = NavigationGuard::new(store.clone(), config.login_path.clone());
    Ok(CliContext { client, store, guard, navigator })
}

async fn run(ctx: &CliContext, command: Command) -> Result<(), CliError> {
    match command {
        Command::Whoami => {
            let session = ctx.store.fetch_session().await;
            match session.user() {
                Some(user) => print_json(user),
                None => {
                    println!("{}", session.display_name());
                    Ok(())
                }
            }
        }
        Command::Login { account, password } => {
            let session = ctx.store.login(&UserLoginRequest { user_account: account, user_password: password }).await?;
            if let Some(cookie) = ctx.client.session_cookie() {
                eprintln!("export ZEROCODE_SESSION_COOKIE='{cookie}'");
            }
            match session.user() {
                Some(user) => print_json(user),
                None => Ok(()),
            }
        }
        Command::Logout => {
            ctx.store.logout().await?;
            println!("logged out");
            Ok(())
        }
        Command::Register { account, password, check_password, name } => {
            let body = UserRegisterRequest {
                user_account: account,
                check_password: check_password.unwrap_or_else(|| password.clone()),
                user_password: password,
                user_name: name,
            };
            print_json(&user::user_register(&ctx.client, &body).await?)
        }
        Command::Visit { path } => {
            ctx.navigator.visit(&path);
            let landed = ctx.guard.resolve(&path).await;
            if landed != path {
                eprintln!("guard redirected {path} -> {landed}");
                ctx.navigator.visit(&landed);
            }
            println!("{}", ctx.navigator.current_href());
            Ok(())
        }
        Command::User(command) => run_user(ctx, command).await,
        Command::App(command) => run_app(ctx, command).await,
        Command::History(command) => run_history(ctx, command).await,
    }
}

async fn run_user(ctx: &CliContext, command: UserCommand) -> Result<(), CliError> {
    enter_route(ctx, USER_MANAGE_ROUTE).await?;
    match command.command {
        UserSubcommand::List { page, name, account, role } => {
            let query = UserQueryRequest {
                page_num: Some(page.page),
                page_size: Some(page.size),
                user_name: name,
                user_account: account,
                user_role: role,
            };
            print_json(&user::list_user_vo_by_page(&ctx.client, &query).await?)
        }
        UserSubcommand::Add { name, account, role } => {
            let body = UserAddRequest { user_name: name, user_account: account, user_role: role };
            print_json(&user::add_user(&ctx.client, &body).await?)
        }
        UserSubcommand::Update { id, name, role } => {
            let body = UserUpdateRequest { id, user_name: name, user_role: role };
            print_json(&user::update_user(&ctx.client, &body).await?)
        }
        UserSubcommand::Delete { id } => print_json(&user::delete_user(&ctx.client, &DeleteRequest { id }).await?),
    }
}

async fn run_app(ctx: &CliContext, command: AppCommand) -> Result<(), CliError> {
    match command.command {
        AppSubcommand::Create { prompt } => {
            print_json(&app::add_app(&ctx.client, &AppAddRequest { init_prompt: prompt }).await?)
        }
        AppSubcommand::Get { id } => print_json(&app::get_app_vo_by_id(&ctx.client, id).await?),
        AppSubcommand::Preview { id } => {
            println!("{}", app::get_preview_path(&ctx.client, id).await?);
            Ok(())
        }
        AppSubcommand::Mine { page, name } => {
            print_json(&app::list_my_app_vo_by_page(&ctx.client, &app_query(&page, name, None)).await?)
        }
        AppSubcommand::Good { page, name } => {
            print_json(&app::list_good_app_vo_by_page(&ctx.client, &app_query(&page, name, None)).await?)
        }
        AppSubcommand::Rename { id, name } => {
            print_json(&app::update_app(&ctx.client, &AppUpdateRequest { id, app_name: name }).await?)
        }
        AppSubcommand::Delete { id } => print_json(&app::delete_app(&ctx.client, &DeleteRequest { id }).await?),
        AppSubcommand::UpdateCode { id, file } => {
            let code_content = std::fs::read_to_string(&file)?;
            print_json(&app::update_app_code(&ctx.client, &AppCodeUpdateRequest { id, code_content }).await?)
        }
        AppSubcommand::Download { id, output } => {
            let file = app::download_app_code(&ctx.client, id).await?;
            let path = download_target(output, file.file_name.as_deref(), id);
            std::fs::write(&path, &file.bytes)?;
            eprintln!("wrote {} bytes to {}", file.bytes.len(), path.display());
            Ok(())
        }
        AppSubcommand::Chat { id, message } => stream_chat(ctx, id, &message).await,
        AppSubcommand::AdminList { page, name, user_id } => {
            enter_route(ctx, APP_MANAGE_ROUTE).await?;
            print_json(&app::list_app_vo_by_page_by_admin(&ctx.client, &app_query(&page, name, user_id)).await?)
        }
        AppSubcommand::AdminUpdate { id, name, priority } => {
            enter_route(ctx, APP_MANAGE_ROUTE).await?;
            let body = AppAdminUpdateRequest { id, app_name: name, priority };
            print_json(&app::update_app_by_admin(&ctx.client, &body).await?)
        }
        AppSubcommand::AdminDelete { id } => {
            enter_route(ctx, APP_MANAGE_ROUTE).await?;
            print_json(&app::delete_app_by_admin(&ctx.client, &DeleteRequest { id }).await?)
        }
    }
}

async fn run_history(ctx: &CliContext, command: HistoryCommand) -> Result<(), CliError> {
    match command.command {
        HistorySubcommand::App { id, page_size, before } => {
            let cursor = ChatHistoryCursor { page_size: Some(page_size), last_create_time: before };
            print_json(&chat_history::list_app_chat_history(&ctx.client, id, &cursor).await?)
        }
        HistorySubcommand::Admin { page, app_id, user_id, message_type } => {
            enter_route(ctx, CHAT_MANAGE_ROUTE).await?;
            let query = ChatHistoryQueryRequest {
                page_num: Some(page.page),
                page_size: Some(page.size),
                app_id,
                user_id,
                message_type,
            };
            print_json(&chat_history::list_all_chat_history_by_page_for_admin(&ctx.client, &query).await?)
        }
    }
}

/// Run the guard for an admin screen before calling its endpoints.
async fn enter_route(ctx: &CliContext, path: &str) -> Result<(), CliError> {
    let landed = ctx.guard.resolve(path).await;
    if landed == path {
        ctx.navigator.visit(path);
        Ok(())
    } else {
        Err(CliError::Denied { path: path.to_owned(), redirect: landed })
    }
}

async fn stream_chat(ctx: &CliContext, id: Id, message: &str) -> Result<(), CliError> {
    ctx.navigator.visit(&format!("/app/chat/{id}"));
    let mut stream = app::chat_to_gen_code(&ctx.client, id, message).await?;
    let mut stdout = io::stdout().lock();
    while let Some(event) = stream.next_event().await {
        let event = event?;
        match event.kind() {
            "message" => {
                stdout.write_all(event.data.as_bytes())?;
                stdout.flush()?;
            }
            "done" => break,
            other => tracing::debug!(event = other, data = %event.data, "chat event"),
        }
    }
    writeln!(stdout)?;
    Ok(())
}

fn app_query(page: &PageArgs, name: Option<String>, user_id: Option<Id>) -> AppQueryRequest {
    AppQueryRequest {
        page_num: Some(page.page),
        page_size: Some(page.size),
        app_name: name,
        user_id,
        ..AppQueryRequest::default()
    }
}

fn download_target(output: Option<PathBuf>, server_name: Option<&str>, id: Id) -> PathBuf {
    if let Some(path) = output {
        return path;
    }
    // Keep only the final component of a server-supplied name.
    let name = server_name
        .and_then(|name| std::path::Path::new(name).file_name())
        .map_or_else(|| format!("app-{id}.zip"), |name| name.to_string_lossy().into_owned());
    PathBuf::from(name)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
