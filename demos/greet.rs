use log::*;
use structopt::StructOpt;

use jbweb::gateway::{self, Environ};
use jbweb::prelude::*;

fn greet(request: &Request, args: Args) -> Result<Response, Error> {
    let greeting = args.param("greeting").unwrap_or("Hello");
    let user = args.param("user").unwrap_or("stranger");
    info!("request {} greets {}", request.id(), user);
    Ok(Response::new(format!("{} {}!", greeting, user)))
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
#[structopt(name = "greet", about = "Greet users through a pattern-routed application.")]
struct Opt {
    #[structopt(default_value = "/greet/World")]
    path: String,
    #[structopt(short, long, default_value = "")]
    query: String,
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,
}

fn main() {
    let opt = Opt::from_args();
    setup_logging(opt.verbose);

    let mut app = Application::with_router(Router::new(PatternMapper::new()));
    app.route(
        "/greet/{user}",
        greet,
        RouteOptions::new().named("greet").with_default("greeting", "Hey"),
    );
    app.route("/{greeting}/{user}", greet, RouteOptions::new().named("custom"));
    match app.url_for("custom", &[("greeting", "Bonjour"), ("user", "le monde")]) {
        Ok(url) => info!("custom greetings live at {}", url),
        Err(e) => warn!("cannot build custom greeting url: {}", e),
    }

    let environ = Environ::new()
        .with_var("PATH_INFO", &opt.path)
        .with_var("QUERY_STRING", &opt.query)
        .with_var("HTTP_HOST", "localhost:8080");
    let body = gateway::serve(&app, environ, |status, headers| {
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
