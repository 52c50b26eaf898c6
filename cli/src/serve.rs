use std::path::{Component, Path, PathBuf};

use anyhow::format_err;
use classifier::app::App;
use classifier::config::Config;
use classifier::render::Renderer;
use rouille::{Request, Response};

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Directory holding metadata.json and the model files
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Address to bind, like 127.0.0.1:5000
    #[arg(long)]
    listen: Option<String>,
}

/// What the server hands out: pages rendered once at startup, and the files
/// of the model directory read on each request.
#[derive(Clone, Debug)]
pub struct Site {
    model_dir: PathBuf,
    inference: String,
    about: String,
}

impl Site {
    pub fn new(config: &Config, model_dir: impl Into<PathBuf>) -> anyhow::Result<Site> {
        let app = App::new(config.preprocessor())?;
        Ok(Site {
            model_dir: model_dir.into(),
            inference: app.document()?,
            about: Renderer::new()?.about()?,
        })
    }
}

pub fn handle(config: Config, args: ServeArgs) -> anyhow::Result<()> {
    let model_dir = args.model_dir.unwrap_or_else(|| PathBuf::from(&config.model));
    let listen = args.listen.clone().unwrap_or_else(|| config.listen.clone());

    if !model_dir.exists() {
        warn!("Model directory {:?} does not exist, creating it", model_dir);
        fs_err::create_dir_all(&model_dir)?;
    }

    let site = Site::new(&config, &model_dir)?;
    let server = rouille::Server::new(&listen, move |request| {
        let response = handle_request(request, &site);
        info!("{} {} -> {}", request.method(), request.raw_url(), response.status_code);
        response
    })
    .map_err(|e| format_err!("Binding {}: {}", listen, e))?;

    println!("Serving {} on http://{}/", model_dir.display(), server.server_addr());
    server.run();
    Ok(())
}

pub fn handle_request(request: &Request, site: &Site) -> Response {
    if request.method() != "GET" {
        return Response::empty_404();
    }
    let url = request.url();
    match url.as_str() {
        "/" | "/inference" => Response::html(site.inference.clone()),
        "/about" => Response::html(site.about.clone()),
        _ => match url.strip_prefix("/model/") {
            Some(file) => model_file(&site.model_dir, file),
            None => Response::empty_404(),
        },
    }
}

fn model_file(model_dir: &Path, file: &str) -> Response {
    let relative = Path::new(file);
    let plain =
        !file.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_)));
    if !plain {
        debug!("Rejecting model file request {:?}", file);
        return Response::empty_404();
    }
    let path = model_dir.join(relative);
    if !path.is_file() {
        error!("Model file not found: {} (expected at {:?})", file, path);
        return Response::json(&serde_json::json!({
            "error": format!("Model file not found: {file}"),
            "path": path.display().to_string(),
        }))
        .with_status_code(404);
    }
    match fs_err::read(&path) {
        Ok(bytes) => {
            let mime = path.extension().and_then(|e| e.to_str()).map(rouille::extension_to_mime);
            Response::from_data(mime.unwrap_or("application/octet-stream"), bytes)
        }
        Err(e) => {
            error!("{e}");
            Response::text(e.to_string()).with_status_code(500)
        }
    }
}
