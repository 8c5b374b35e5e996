use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use leaf_serve::Registry;
use log::{error, info};
use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;

mod error;
mod form;
mod pages;
mod routes;
mod session;
mod uploads;

use routes::App;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "leaf-web",
    about = "Web front end that diagnoses plant diseases from leaf photos"
)]
struct CmdArgs {
    #[structopt(long, env = "LEAF_ADDR", default_value = "127.0.0.1:5000")]
    addr: SocketAddr,

    #[structopt(
        long,
        env = "LEAF_MODELS_DIR",
        default_value = "models",
        parse(from_os_str),
        help = "Directory holding one SavedModel export per crop"
    )]
    models_dir: PathBuf,

    #[structopt(
        long,
        env = "LEAF_UPLOADS_DIR",
        default_value = "uploads",
        parse(from_os_str),
        help = "Where uploaded photos are stored; emptied on startup"
    )]
    uploads_dir: PathBuf,

    #[structopt(long, env = "LEAF_MAX_UPLOAD_BYTES", default_value = "16777216")]
    max_upload_bytes: u64,

    #[structopt(
        long,
        env = "LEAF_SESSION_IDLE_MINUTES",
        default_value = "1440",
        help = "Forget a plant choice after this long without requests"
    )]
    session_idle_minutes: i64,

    #[structopt(long, env = "LEAF_MAX_SESSIONS", default_value = "10000")]
    max_sessions: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CmdArgs::from_args();

    uploads::reset_dir(&args.uploads_dir)?;

    let registry = Arc::new(Registry::load(&args.models_dir)?);
    let app = Arc::new(
        App::new(registry, args.uploads_dir, args.max_upload_bytes).with_session_limits(
            chrono::Duration::minutes(args.session_idle_minutes),
            args.max_sessions,
        ),
    );

    let make_service = make_service_fn(move |_conn: &AddrStream| {
        let app = Arc::clone(&app);

        let service = service_fn(move |req| routes::handle(req, Arc::clone(&app)));

        async move { Ok::<_, Infallible>(service) }
    });

    let server = Server::try_bind(&args.addr)?.serve(make_service);
    info!("Listening on http://{}", args.addr);

    if let Err(e) = server.await {
        error!("server error: {}", e);
    }

    Ok(())
}
