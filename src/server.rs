use log::info;
use std::io::{self, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use crate::config::Config;
use crate::http;
use crate::log_request;
use crate::router::handlers::handle_request;

pub fn start_server(config: Config) -> io::Result<()> {
    let listener = TcpListener::bind(&config.listen_addr)?;
    info!("Listening on {}", config.listen_addr);
    info!(
        "Serving {} under {} (probe at {})",
        config.root_dir.display(),
        config.doc_prefix,
        config.probe_path
    );

    for stream in listener.incoming() {
        let stream = stream?;
        let config = config.clone();

        thread::spawn(move || {
            if let Err(e) = handle_connection(stream, &config) {
                log::error!("Error handling connection: {}", e);
            }
        });
    }

    Ok(())
}

fn handle_connection(mut client: TcpStream, config: &Config) -> io::Result<()> {
    let mut reader = BufReader::new(client.try_clone()?);

    match http::read_request(&mut reader)? {
        Some(request) => {
            log_request!(request.method, request.path);
            handle_request(&mut client, config, &request)
        }
        None => {
            client.write_all(
                b"HTTP/1.1 400 Bad Request\r\n\
                  Content-Type: text/plain\r\n\
                  Content-Length: 11\r\n\
                  \r\n\
                  Bad Request",
            )?;
            Ok(())
        }
    }
}
