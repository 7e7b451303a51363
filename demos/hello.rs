use log::*;
use structopt::StructOpt;

use jbweb::gateway::{self, Environ};
use jbweb::prelude::*;

fn hello(request: &Request, _args: Args) -> Result<Response, Error> {
    debug!("saying hello to request {}", request.id());
    Ok(Response::new("Hello World!").with_header("Content-Type", &TextPlain::media_type()))
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
#[structopt(name = "hello", about = "Serve one request with a hello world application.")]
struct Opt {
    #[structopt(default_value = "/")]
    path: String,
    #[structopt(short, long, default_value = "GET")]
    method: String,
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,
}

fn main() {
    let opt = Opt::from_args();
    setup_logging(opt.verbose);

    let mut app = Application::new();
    app.route("/", hello, RouteOptions::default());

    let environ = Environ::new()
        .with_var("REQUEST_METHOD", &opt.method)
        .with_var("PATH_INFO", &opt.path)
        .with_var("SERVER_NAME", "localhost")
        .with_var("SERVER_PORT", "8080");
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
