use std::{error::Error, fs, path::PathBuf, sync::Arc, thread};

use clap::{Parser, Subcommand};
use log::{info, warn};
use roosty_alarm::{
    audio::RodioBackend,
    config::Config,
    playback::{AudioBackend, PlaybackController},
    ringtone::RingtoneResolver,
    settings::SettingsStore,
    trigger::TriggerLoop,
    web::{self, AppState},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// config file to use instead of the default one
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(long, short)]
    port: Option<u16>,
    #[clap(long)]
    music_dir: Option<PathBuf>,
    /// where the alarm is saved
    #[clap(long)]
    settings: Option<PathBuf>,
    /// don't open the alarm page in a browser on startup
    #[clap(long)]
    no_browser: bool,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write a default config file and create the music folder
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// run the alarm checker and web page (the default)
    Serve,
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("roosty_alarm").expect("couldn't initialize logger");

    let args = Args::parse();
    let config_path = match args.config.clone() {
        Some(path) => path,
        None => Config::config_path()?,
    };

    if let Some(Command::Init { force }) = args.command {
        return init(&config_path, force);
    }

    let mut config = Config::load_or_default(&config_path)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(music_dir) = args.music_dir {
        config.music_dir = Some(music_dir);
    }
    if let Some(settings) = args.settings {
        config.settings_file = Some(settings);
    }
    if args.no_browser {
        config.open_browser = false;
    }
    serve(&config)
}

fn init(config_path: &std::path::Path, force: bool) -> Result<(), Box<dyn Error>> {
    if config_path.exists() && !force {
        println!(
            "config already exists at {}, use --force to overwrite it",
            config_path.display()
        );
        return Ok(());
    }
    let config = Config::new();
    config.save(config_path)?;
    let music_dir = config
        .music_dir
        .clone()
        .unwrap_or_else(|| Config::app_dir().join("music"));
    fs::create_dir_all(&music_dir)?;
    println!(
        "wrote {}, put .mp3 or .wav files in {}",
        config_path.display(),
        music_dir.display()
    );
    Ok(())
}

fn serve(config: &Config) -> Result<(), Box<dyn Error>> {
    let store = SettingsStore::new(config.settings_path());
    let resolver = RingtoneResolver::new(config.music_dir.clone(), Config::app_dir());

    // keep going without sound so the page can say what's wrong
    let backend = match RodioBackend::open() {
        Ok(backend) => Some(Box::new(backend) as Box<dyn AudioBackend>),
        Err(e) => {
            warn!("{e}, running without audio");
            None
        }
    };
    let controller = Arc::new(PlaybackController::new(backend));

    let trigger = TriggerLoop::new(store.clone(), resolver.clone(), controller.clone());
    thread::Builder::new()
        .name("alarm".to_string())
        .spawn(move || trigger.run())?;

    let state = AppState {
        store: Arc::new(store),
        resolver: Arc::new(resolver),
        controller,
        preview: config.preview_duration(),
    };
    let app = web::router(state.clone(), std::env::current_dir()?);
    let address = config.address();
    let url = config.page_url();
    let open_browser = config.open_browser;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(address).await?;
        info!(
            "serving http://{address} (music dir: {}, alarm file: {})",
            state.resolver.music_dir().display(),
            state.store.path().display()
        );
        println!("serving http://{address}");
        if open_browser {
            if let Err(e) = open::that(&url) {
                warn!("couldn't open {url} in a browser: {e}");
            }
        }
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
    })?;
    Ok(())
}
