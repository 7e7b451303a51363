use std::io::Cursor;
use std::sync::{Arc, Mutex};

use log::*;
use structopt::StructOpt;

use jbweb::gateway::{self, Environ};
use jbweb::prelude::*;
use jbweb::render::{Json, Rendered};

#[derive(serde::Serialize, Debug, Clone)]
struct Entry {
    id: usize,
    title: String,
    text: String,
}

#[derive(Debug, Default)]
struct Store {
    entries: Mutex<Vec<Entry>>,
}

/// A per-request handle on the store.
struct Db {
    store: Arc<Store>,
}

impl Db {
    fn connect(store: Arc<Store>, request: &Request) -> Self {
        debug!("request {} connected to the store", request.id());
        Self { store }
    }

    fn insert(&self, title: &str, text: &str) -> Result<usize, Error> {
        let mut entries = self.store.entries.lock().map_err(|_| "store poisoned")?;
        let id = entries.len() + 1;
        entries.push(Entry {
            id,
            title: title.to_string(),
            text: text.to_string(),
        });
        Ok(id)
    }

    fn latest(&self, limit: usize) -> Result<Vec<Entry>, Error> {
        let entries = self.store.entries.lock().map_err(|_| "store poisoned")?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}

fn show_entries(_request: &Request, args: Args) -> Result<Vec<Entry>, Error> {
    let db = args.resource::<Db>("db").ok_or("no database")?;
    let config = args.resource::<Config>("config").ok_or("no config")?;
    let page_size = config.get_parsed::<usize>("page_size")?.unwrap_or(10);
    db.latest(page_size)
}

fn add_entry(request: &Request, args: Args) -> Result<Response, Error> {
    let db = args.resource::<Db>("db").ok_or("no database")?;
    let form = Query::parse(&String::from_utf8(request.read_content()?)?);
    let title = match form.get_first("title") {
        Some(title) => title,
        None => return Ok(Response::new("title is required").with_code(400)),
    };
    let id = db.insert(title, form.get_first("text").unwrap_or(""))?;
    info!("added entry {}", id);
    request.flash("New entry was successfully posted");
    Ok(Response::redirect("/", 303))
}

fn setup_logging(verbosity: usize) {
    stderrlog::new()
        .module(module_path!())
        .module("jbweb")
        .verbosity(verbosity)
        .timestamp(stderrlog::Timestamp::Millisecond)
        .init()
        .unwrap();
}

#[derive(Debug, StructOpt)]
#[structopt(name = "entries", about = "Post and list blog entries as JSON.")]
struct Opt {
    /// Form-encoded entry to post before listing, e.g. "title=Hi&text=Hello"
    #[structopt(short, long)]
    data: Option<String>,
    #[structopt(short, long, default_value = "*/*")]
    accept: String,
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,
}

fn serve(app: &Application, environ: Environ) {
    let body = gateway::serve(app, environ, |status, headers| {
        println!("{}", status);
        for (name, value) in headers {
            println!("{}: {}", name, value);
        }
        println!();
    });
    for chunk in body {
        println!("{}", String::from_utf8_lossy(&chunk));
    }
}

fn main() {
    let opt = Opt::from_args();
    setup_logging(opt.verbose);

    let mut app = Application::new().with_config(Config::from_env("FLASKR_"));
    let store = Arc::new(Store::default());
    app.provides_with_request("db", move |request| Ok(Db::connect(store.clone(), request)))
        .unwrap();

    let show = app.needs(&["db", "config"], Rendered::new(Json, show_entries));
    app.route("/", show, RouteOptions::new().named("show_entries"));
    let add = app.needs(&["db"], add_entry);
    app.route("/add", add, RouteOptions::new().methods(&[Method::POST]));

    if let Some(data) = opt.data {
        let environ = Environ::new()
            .with_var("REQUEST_METHOD", "POST")
            .with_var("PATH_INFO", "/add")
            .with_var("CONTENT_TYPE", "application/x-www-form-urlencoded")
            .with_var("CONTENT_LENGTH", &data.len().to_string())
            .with_var("HTTP_HOST", "localhost")
            .with_input(Cursor::new(data.into_bytes()));
        serve(&app, environ);
    }

    let environ = Environ::new()
        .with_var("PATH_INFO", "/")
        .with_var("HTTP_HOST", "localhost")
        .with_var("HTTP_ACCEPT", &opt.accept);
    serve(&app, environ);
}
