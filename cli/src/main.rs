mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use ferreteria::auth::{AuthError, FirebaseAuth, SessionContext};
use ferreteria::backend::firestore::FirestoreStore;
use ferreteria::backend::storage::FirebaseStorage;
use ferreteria::backend::{DocumentStore, ObjectStorage, StorageError, StoreError};
use ferreteria::catalog::{BookController, CatalogController, group_by_category};
use ferreteria::chat::{CategoryAssistant, MessageLog, SubmitOutcome};
use ferreteria::config::{BackendConfig, ConfigError, ViewConfig};
use ferreteria::connectivity::{ConnectivityMonitor, HttpProbe, Probe, banner_for};
use ferreteria::llm::{GeminiClient, LlmError};
use ferreteria::models::{Book, Category, PdfUpload, Product, ProductForm};
use ferreteria::mutation::MutationError;
use ferreteria::reports::{self, ReportError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuración inválida: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("{}", .0.message())]
    Mutation(#[from] MutationError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Llm(#[from] LlmError),
    #[error("{0}")]
    Report(#[from] ReportError),
    #[error("no se pudo crear el cliente HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no existe {noun} con id {id}")]
    NotFound { noun: &'static str, id: String },
    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Notice(String),
}

#[derive(Parser, Debug)]
#[command(name = "ferreteria", about = "Catálogo de la ferretería: categorías, productos, libros y chat")]
struct Cli {
    #[arg(long, env = "FERRETERIA_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "FERRETERIA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Categorías de productos
    Categorias(CategoryCommand),
    /// Productos, copias y reportes
    Productos(ProductCommand),
    /// Libros con su PDF
    Libros(BookCommand),
    /// Catálogo público agrupado por categoría
    Catalogo {
        #[arg(long)]
        categoria: Option<String>,
    },
    /// Registrar categorías conversando con la IA
    Chat,
    /// Comprobar las credenciales configuradas
    Login,
    /// Cerrar la sesión
    Logout,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long, default_value = "")]
    buscar: String,

    #[arg(long, default_value_t = 1)]
    pagina: usize,
}

#[derive(Args, Debug)]
struct OutputArgs {
    #[arg(long, default_value = ".")]
    salida: PathBuf,
}

#[derive(Args, Debug)]
struct CategoryCommand {
    #[command(subcommand)]
    command: CategorySubcommand,
}

#[derive(Subcommand, Debug)]
enum CategorySubcommand {
    List(ListArgs),
    Create {
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        descripcion: String,
    },
    Update {
        id: String,
        #[arg(long)]
        nombre: Option<String>,
        #[arg(long)]
        descripcion: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
struct ProductCommand {
    #[command(subcommand)]
    command: ProductSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProductSubcommand {
    List(ListArgs),
    Create {
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        precio: String,
        #[arg(long)]
        categoria: String,
        #[arg(long)]
        imagen: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        nombre: Option<String>,
        #[arg(long)]
        precio: Option<String>,
        #[arg(long)]
        categoria: Option<String>,
        #[arg(long)]
        imagen: Option<String>,
    },
    Delete {
        id: String,
    },
    /// Imprimir el resumen de un producto para copiarlo
    Copiar {
        id: String,
    },
    ReportePdf {
        #[arg(long, default_value = "")]
        buscar: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    ReporteExcel {
        #[arg(long, default_value = "")]
        buscar: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    DetallePdf {
        id: String,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug)]
struct BookCommand {
    #[command(subcommand)]
    command: BookSubcommand,
}

#[derive(Subcommand, Debug)]
enum BookSubcommand {
    List(ListArgs),
    Create {
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        autor: String,
        #[arg(long)]
        genero: String,
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    Update {
        id: String,
        #[arg(long)]
        nombre: Option<String>,
        #[arg(long)]
        autor: Option<String>,
        #[arg(long)]
        genero: Option<String>,
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    Delete {
        id: String,
    },
}

/// Shared collaborators for one invocation.
struct App {
    backend: BackendConfig,
    view: ViewConfig,
    session: SessionContext,
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
    http: reqwest::Client,
    credentials: Option<(String, String)>,
}

impl App {
    fn from_env(cli: &Cli) -> Result<Self, CliError> {
        let backend = BackendConfig::from_env()?;
        let view = ViewConfig::from_env()?;
        let session = SessionContext::anonymous();
        let store = Arc::new(FirestoreStore::new(&backend, session.clone())?);
        let storage = Arc::new(FirebaseStorage::new(&backend, session.clone())?);
        let http = backend.timeouts.client()?;
        let credentials = cli.email.clone().zip(cli.password.clone());
        Ok(Self { backend, view, session, store, storage, http, credentials })
    }

    /// Sign in with the configured credentials, if any. Without them the
    /// session stays anonymous and mutations are refused.
    async fn authenticate(&self) -> Result<(), CliError> {
        let Some((email, password)) = &self.credentials else {
            return Ok(());
        };
        let provider = FirebaseAuth::new(&self.backend)?;
        self.session.sign_in(&provider, email, password).await?;
        Ok(())
    }

    fn categories(&self) -> CatalogController<Category> {
        CatalogController::new(Arc::clone(&self.store), self.session.clone(), self.view.page_size)
    }

    fn products(&self) -> CatalogController<Product> {
        CatalogController::new(Arc::clone(&self.store), self.session.clone(), self.view.page_size)
    }

    fn books(&self) -> BookController {
        BookController::new(
            Arc::clone(&self.store),
            Arc::clone(&self.storage),
            self.session.clone(),
            self.view.page_size,
        )
    }

    /// Print the offline banner when the document service does not answer.
    async fn check_connectivity(&self) {
        let probe = HttpProbe::new(self.http.clone(), self.backend.firestore_base_url.clone());
        if let Some(banner) = banner_for(probe.reachable().await) {
            eprintln!("{banner}");
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            if let CliError::Mutation(e) = &error {
                if let Some(route) = e.redirect() {
                    eprintln!("Inicia sesión ({}) definiendo FERRETERIA_EMAIL y FERRETERIA_PASSWORD.", route.path());
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let app = App::from_env(&cli)?;
    app.check_connectivity().await;

    match cli.command {
        Command::Categorias(command) => run_categories(&app, command).await,
        Command::Productos(command) => run_products(&app, command).await,
        Command::Libros(command) => run_books(&app, command).await,
        Command::Catalogo { categoria } => run_catalog(&app, categoria.as_deref()).await,
        Command::Chat => run_chat(&app).await,
        Command::Login => run_login(&app).await,
        Command::Logout => run_logout(&app).await,
    }
}

// =============================================================================
// CATEGORIES
// =============================================================================

async fn run_categories(app: &App, category: CategoryCommand) -> Result<(), CliError> {
    let mut controller = app.categories();
    match category.command {
        CategorySubcommand::List(args) => {
            load(&mut controller).await?;
            controller.set_search_term(args.buscar);
            controller.set_page(args.pagina);
            print!("{}", render::categories(&controller.visible()));
            println!("{}", render::pager(args.pagina, controller.page_count(), controller.filtered().len()));
            Ok(())
        }
        CategorySubcommand::Create { nombre, descripcion } => {
            app.authenticate().await?;
            let id = controller.create(Category::new(nombre, descripcion)).await?;
            println!("Categoría agregada: {id}");
            report_notice(controller.notice());
            Ok(())
        }
        CategorySubcommand::Update { id, nombre, descripcion } => {
            app.authenticate().await?;
            load(&mut controller).await?;
            let mut record = existing(&controller, "la categoría", &id)?;
            record.name = nombre.unwrap_or(record.name);
            record.description = descripcion.unwrap_or(record.description);
            controller.update(record).await?;
            println!("Categoría actualizada: {id}");
            report_notice(controller.notice());
            Ok(())
        }
        CategorySubcommand::Delete { id } => {
            app.authenticate().await?;
            controller.delete(&id).await?;
            println!("Categoría eliminada: {id}");
            report_notice(controller.notice());
            Ok(())
        }
    }
}

// =============================================================================
// PRODUCTS
// =============================================================================

async fn run_products(app: &App, product: ProductCommand) -> Result<(), CliError> {
    let mut controller = app.products();
    match product.command {
        ProductSubcommand::List(args) => {
            load(&mut controller).await?;
            controller.set_search_term(args.buscar);
            controller.set_page(args.pagina);
            print!("{}", render::products(&controller.visible()));
            println!("{}", render::pager(args.pagina, controller.page_count(), controller.filtered().len()));
            Ok(())
        }
        ProductSubcommand::Create { nombre, precio, categoria, imagen } => {
            app.authenticate().await?;
            let form = ProductForm { id: String::new(), name: nombre, price: precio, category: categoria, image: imagen };
            let id = controller.create(form).await?;
            println!("Producto agregado: {id}");
            report_notice(controller.notice());
            Ok(())
        }
        ProductSubcommand::Update { id, nombre, precio, categoria, imagen } => {
            app.authenticate().await?;
            load(&mut controller).await?;
            let current = existing(&controller, "el producto", &id)?;
            let form = ProductForm {
                id: id.clone(),
                name: nombre.unwrap_or(current.name),
                price: precio.unwrap_or_else(|| current.price.to_string()),
                category: categoria.unwrap_or(current.category),
                image: imagen.or(current.image),
            };
            controller.update(form).await?;
            println!("Producto actualizado: {id}");
            report_notice(controller.notice());
            Ok(())
        }
        ProductSubcommand::Delete { id } => {
            app.authenticate().await?;
            controller.delete(&id).await?;
            println!("Producto eliminado: {id}");
            report_notice(controller.notice());
            Ok(())
        }
        ProductSubcommand::Copiar { id } => {
            load(&mut controller).await?;
            println!("{}", existing(&controller, "el producto", &id)?.clipboard_text());
            Ok(())
        }
        ProductSubcommand::ReportePdf { buscar, output } => {
            load(&mut controller).await?;
            controller.set_search_term(buscar);
            let products: Vec<Product> = controller.filtered().into_iter().cloned().collect();
            let bytes = reports::product_list_pdf(&products)?;
            let name = reports::report_file_name("productos", "pdf", reports::today());
            write_report(&output.salida, &name, &bytes).await
        }
        ProductSubcommand::ReporteExcel { buscar, output } => {
            load(&mut controller).await?;
            controller.set_search_term(buscar);
            let products: Vec<Product> = controller.filtered().into_iter().cloned().collect();
            let bytes = reports::product_sheet_xlsx(&products)?;
            let name = reports::report_file_name("productos", "xlsx", reports::today());
            write_report(&output.salida, &name, &bytes).await
        }
        ProductSubcommand::DetallePdf { id, output } => {
            load(&mut controller).await?;
            let product = existing(&controller, "el producto", &id)?;
            let image = match &product.image {
                Some(url) => reports::fetch_image(&app.http, url).await,
                None => None,
            };
            let bytes = reports::product_detail_pdf(&product, image.as_ref())?;
            write_report(&output.salida, &reports::detail_file_name(&product.name), &bytes).await
        }
    }
}

// =============================================================================
// BOOKS
// =============================================================================

async fn run_books(app: &App, book: BookCommand) -> Result<(), CliError> {
    let mut controller = app.books();
    match book.command {
        BookSubcommand::List(args) => {
            load(controller.list_mut()).await?;
            let list = controller.list_mut();
            list.set_search_term(args.buscar);
            list.set_page(args.pagina);
            print!("{}", render::books(&list.visible()));
            println!("{}", render::pager(args.pagina, list.page_count(), list.filtered().len()));
            Ok(())
        }
        BookSubcommand::Create { nombre, autor, genero, pdf } => {
            app.authenticate().await?;
            let upload = match pdf {
                Some(path) => Some(read_pdf(&path).await?),
                None => None,
            };
            let record = Book { id: String::new(), name: nombre, author: autor, genre: genero, pdf_url: String::new() };
            let id = controller.create(record, upload).await?;
            println!("Libro agregado: {id}");
            report_notice(controller.list().notice());
            Ok(())
        }
        BookSubcommand::Update { id, nombre, autor, genero, pdf } => {
            app.authenticate().await?;
            load(controller.list_mut()).await?;
            let mut record = existing(controller.list(), "el libro", &id)?;
            record.name = nombre.unwrap_or(record.name);
            record.author = autor.unwrap_or(record.author);
            record.genre = genero.unwrap_or(record.genre);
            let upload = match pdf {
                Some(path) => Some(read_pdf(&path).await?),
                None => None,
            };
            controller.update(record, upload).await?;
            println!("Libro actualizado: {id}");
            report_notice(controller.list().notice());
            Ok(())
        }
        BookSubcommand::Delete { id } => {
            app.authenticate().await?;
            load(controller.list_mut()).await?;
            controller.delete(&id).await?;
            println!("Libro eliminado: {id}");
            report_notice(controller.list().notice());
            Ok(())
        }
    }
}

async fn read_pdf(path: &Path) -> Result<PdfUpload, CliError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| CliError::File { path: path.to_path_buf(), source })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "documento.pdf".to_string(), |n| n.to_string_lossy().into_owned());
    Ok(PdfUpload { file_name, bytes })
}

// =============================================================================
// CATALOG, CHAT, SESSION
// =============================================================================

async fn run_catalog(app: &App, category: Option<&str>) -> Result<(), CliError> {
    let mut controller = app.products();
    load(&mut controller).await?;
    print!("{}", render::catalog(&group_by_category(controller.records(), category)));
    Ok(())
}

async fn run_chat(app: &App) -> Result<(), CliError> {
    let llm = Arc::new(GeminiClient::from_env()?);
    let assistant = CategoryAssistant::new(llm, Arc::clone(&app.store));

    let mut snapshots = assistant.subscribe();
    let (printed_tx, printed_rx) = watch::channel(0_usize);
    let printer = tokio::spawn(async move {
        let mut log = MessageLog::default();
        let mut printed = 0;
        while let Some(snapshot) = snapshots.next().await {
            log.apply(snapshot);
            if let Some(error) = log.error() {
                eprintln!("{error}");
                continue;
            }
            let lines = log.lines();
            for line in render::unprinted(&lines, printed) {
                println!("{line}");
            }
            printed = lines.len();
            printed_tx.send_replace(printed);
        }
    });

    let monitor = ConnectivityMonitor::spawn(
        Arc::new(HttpProbe::new(app.http.clone(), app.backend.firestore_base_url.clone())),
        app.view.probe_interval,
    );
    let mut online = monitor.subscribe();
    let banner = tokio::spawn(async move {
        while online.changed().await.is_ok() {
            let now = *online.borrow_and_update();
            eprintln!("{}", banner_for(now).unwrap_or("Conexión restablecida."));
        }
    });

    eprintln!("Escribe un mensaje para registrar una categoría (\"salir\" para terminar).");
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = input
        .next_line()
        .await
        .map_err(|source| CliError::File { path: PathBuf::from("<stdin>"), source })?
    {
        let line = line.trim();
        if line == "salir" {
            break;
        }
        if let SubmitOutcome::Registered { id, .. } = assistant.submit(line).await {
            tracing::info!(%id, "chat: category created from prompt");
        }
    }

    printer.abort();
    let _ = printer.await;
    banner.abort();
    drop(monitor);

    // Replies written after the last poll.
    if let Some(snapshot) = assistant.subscribe().next().await {
        let mut log = MessageLog::default();
        log.apply(snapshot);
        let lines = log.lines();
        for line in render::unprinted(&lines, *printed_rx.borrow()) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_login(app: &App) -> Result<(), CliError> {
    if app.credentials.is_none() {
        return Err(CliError::Notice("Define FERRETERIA_EMAIL y FERRETERIA_PASSWORD para iniciar sesión.".into()));
    }
    app.authenticate().await?;
    if let Some(user) = app.session.current_user() {
        println!("Sesión iniciada como {}", user.email);
    }
    Ok(())
}

async fn run_logout(app: &App) -> Result<(), CliError> {
    app.authenticate().await?;
    app.session.end_session()?;
    println!("Sesión cerrada.");
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

async fn load<T: ferreteria::catalog::CatalogRecord>(controller: &mut CatalogController<T>) -> Result<(), CliError> {
    if let Err(e) = controller.load().await {
        let notice = controller.notice().map(ToOwned::to_owned);
        return Err(notice.map_or(CliError::Store(e), CliError::Notice));
    }
    Ok(())
}

fn existing<T: ferreteria::catalog::CatalogRecord>(
    controller: &CatalogController<T>,
    noun: &'static str,
    id: &str,
) -> Result<T, CliError> {
    controller
        .find(id)
        .cloned()
        .ok_or_else(|| CliError::NotFound { noun, id: id.to_string() })
}

/// A stale list after a successful write is worth a mention, not a failure.
fn report_notice(notice: Option<&str>) {
    if let Some(notice) = notice {
        eprintln!("{notice}");
    }
}

async fn write_report(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), CliError> {
    let path = dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| CliError::File { path: path.clone(), source })?;
    println!("{}", path.display());
    Ok(())
}
