#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// Loopback server that records what clients asked for.
pub struct LocalServer {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<String>>>,
}

impl LocalServer {
    pub fn url(&self, scheme: &str, path: &str) -> String {
        format!("{scheme}://{}{path}", self.addr)
    }

    /// HTTP request targets, or FTP command lines, in arrival order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

pub fn http_response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n",
        body.len()
    );
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str("\r\n");
    response.push_str(body);
    response
}

/// Answers every HTTP request with `handler(target)`, one request per connection.
pub fn spawn_http<F>(handler: F) -> LocalServer
where
    F: Fn(&str) -> String + Send + 'static,
{
    spawn(move |stream, seen| {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).is_err() {
            return;
        }
        loop {
            let mut header = String::new();
            match reader.read_line(&mut header) {
                Ok(0) | Err(_) => break,
                Ok(_) if header == "\r\n" => break,
                Ok(_) => {}
            }
        }
        let target = request_line
            .split_whitespace()
            .nth(1)
            .unwrap_or("/")
            .to_string();
        seen.lock().unwrap().push(target.clone());
        let mut stream = stream;
        let _ = stream.write_all(handler(&target).as_bytes());
        let _ = stream.flush();
    })
}

/// Control-channel-only FTP server: greets with 220, then replies to each
/// command line with `handler(command, argument)`.
pub fn spawn_ftp<F>(handler: F) -> LocalServer
where
    F: Fn(&str, &str) -> String + Send + 'static,
{
    spawn(move |stream, seen| {
        let mut writer = stream.try_clone().unwrap();
        if writer.write_all(b"220 local ftp ready\r\n").is_err() {
            return;
        }
        let mut reader = BufReader::new(stream);
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim_end().to_string();
            seen.lock().unwrap().push(line.clone());
            let (command, argument) = line.split_once(' ').unwrap_or((line.as_str(), ""));
            let command = command.to_ascii_uppercase();
            let reply = handler(&command, argument);
            if writer.write_all(format!("{reply}\r\n").as_bytes()).is_err() {
                break;
            }
            if command == "QUIT" {
                break;
            }
        }
    })
}

/// Anonymous FTP server exposing the given files and directories.
pub fn anonymous_ftp(files: &'static [&'static str], dirs: &'static [&'static str]) -> LocalServer {
    spawn_ftp(move |command, argument| match command {
        "USER" => "331 Please specify the password.".to_string(),
        "PASS" => "230 Login successful.".to_string(),
        "TYPE" => "200 Switching to Binary mode.".to_string(),
        "SIZE" if files.contains(&argument) => "213 1048576".to_string(),
        "CWD" if dirs.contains(&argument.trim_end_matches('/')) => {
            "250 Directory successfully changed.".to_string()
        }
        "SIZE" | "CWD" => "550 No such file or directory.".to_string(),
        "QUIT" => "221 Goodbye.".to_string(),
        _ => "502 Command not implemented.".to_string(),
    })
}

fn spawn<F>(serve: F) -> LocalServer
where
    F: Fn(TcpStream, &Arc<Mutex<Vec<String>>>) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);
    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => serve(stream, &recorded),
                Err(_) => break,
            }
        }
    });
    LocalServer { addr, seen }
}
