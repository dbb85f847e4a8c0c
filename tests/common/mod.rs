// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// tests/common/mod.rs - 测试用 HTTP 服务与数据集
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

#![allow(dead_code)]

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::{ImageFormat, RgbImage};
use url::Url;

/// 收到的一次请求
#[derive(Debug, Clone)]
pub struct Request {
  pub head: String,
  pub body: Vec<u8>,
}

impl Request {
  pub fn request_line(&self) -> &str {
    self.head.lines().next().unwrap_or_default()
  }

  pub fn header(&self, name: &str) -> Option<String> {
    self.head.lines().skip(1).find_map(|line| {
      let (key, value) = line.split_once(':')?;
      key
        .trim()
        .eq_ignore_ascii_case(name)
        .then(|| value.trim().to_string())
    })
  }

  pub fn body_text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

/// 按顺序返回预设响应的 HTTP 服务，应答完后再等一小会儿统计多余的连接
pub struct MockServer {
  pub url: Url,
  handle: JoinHandle<(Vec<Request>, usize)>,
}

impl MockServer {
  pub fn start(responses: Vec<(u16, Vec<u8>)>) -> Self {
    Self::start_with_content_type(responses, None)
  }

  /// 每个响应都带上给定的 `Content-Type`
  pub fn start_with_content_type(responses: Vec<(u16, Vec<u8>)>, content_type: Option<&str>) -> Self {
    let content_type = content_type.map(str::to_string);
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    listener.set_nonblocking(true).expect("nonblocking listener");
    let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();

    let handle = thread::spawn(move || {
      let mut requests = Vec::new();
      let deadline = Instant::now() + Duration::from_secs(10);
      let mut pending = responses.into_iter();
      let mut next = pending.next();

      while let Some((status, body)) = next.take() {
        match listener.accept() {
          Ok((stream, _)) => {
            requests.push(serve(stream, status, &body, content_type.as_deref()));
            next = pending.next();
          }
          Err(err) if err.kind() == ErrorKind::WouldBlock && Instant::now() < deadline => {
            next = Some((status, body));
            thread::sleep(Duration::from_millis(10));
          }
          Err(_) => break,
        }
      }

      let mut extra = 0;
      let quiet = Instant::now() + Duration::from_millis(300);
      while Instant::now() < quiet {
        if listener.accept().is_ok() {
          extra += 1;
        }
        thread::sleep(Duration::from_millis(10));
      }
      (requests, extra)
    });

    MockServer { url, handle }
  }

  /// 返回收到的请求和多余连接数
  pub fn finish(self) -> (Vec<Request>, usize) {
    self.handle.join().expect("mock server thread")
  }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
  haystack.windows(needle.len()).position(|w| w == needle)
}

fn serve(mut stream: TcpStream, status: u16, body: &[u8], content_type: Option<&str>) -> Request {
  stream.set_nonblocking(false).unwrap();
  stream
    .set_read_timeout(Some(Duration::from_secs(5)))
    .unwrap();

  let mut buffer = Vec::new();
  let mut chunk = [0u8; 8192];
  let header_end = loop {
    if let Some(pos) = find(&buffer, b"\r\n\r\n") {
      break pos + 4;
    }
    let n = stream.read(&mut chunk).unwrap();
    if n == 0 {
      break buffer.len();
    }
    buffer.extend_from_slice(&chunk[..n]);
  };

  let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
  let mut request = Request {
    head,
    body: Vec::new(),
  };
  let content_length = request
    .header("content-length")
    .and_then(|v| v.parse::<usize>().ok());
  let chunked = request
    .header("transfer-encoding")
    .map(|v| v.eq_ignore_ascii_case("chunked"))
    .unwrap_or(false);

  let mut rest = buffer[header_end..].to_vec();
  loop {
    let done = match content_length {
      Some(len) => rest.len() >= len,
      None if chunked => rest.ends_with(b"0\r\n\r\n"),
      None => true,
    };
    if done {
      break;
    }
    let n = stream.read(&mut chunk).unwrap();
    if n == 0 {
      break;
    }
    rest.extend_from_slice(&chunk[..n]);
  }
  request.body = rest;

  let reason = if (200..300).contains(&status) {
    "OK"
  } else {
    "Error"
  };
  let extra_header = content_type
    .map(|value| format!("Content-Type: {}\r\n", value))
    .unwrap_or_default();
  let head = format!(
    "HTTP/1.1 {} {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
    status,
    reason,
    extra_header,
    body.len()
  );
  stream.write_all(head.as_bytes()).unwrap();
  stream.write_all(body).unwrap();
  stream.flush().unwrap();
  request
}

pub fn client() -> reqwest::blocking::Client {
  reqwest::blocking::Client::builder()
    .no_proxy()
    .build()
    .expect("build client")
}

pub fn annotation_xml(folder: &str, filename: &str, objects: &[(&str, &[(i32, i32)])]) -> String {
  let mut xml = format!(
    "<annotation>\n<filename>{}</filename>\n<folder>{}</folder>\n",
    filename, folder
  );
  for (name, points) in objects {
    xml.push_str(&format!("<object><name>{}</name><polygon>", name));
    for (x, y) in points.iter() {
      xml.push_str(&format!("<pt><x>{}</x><y>{}</y></pt>", x, y));
    }
    xml.push_str("</polygon></object>\n");
  }
  xml.push_str("</annotation>\n");
  xml
}

pub fn write_png(path: &Path, width: u32, height: u32) {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  RgbImage::new(width, height)
    .save_with_format(path, ImageFormat::Png)
    .unwrap();
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
  let mut bytes = std::io::Cursor::new(Vec::new());
  RgbImage::new(width, height)
    .write_to(&mut bytes, ImageFormat::Png)
    .unwrap();
  bytes.into_inner()
}
