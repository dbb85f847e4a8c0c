// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// tests/push.rs - 上传与标注流程测试
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

mod common;

use std::path::Path;

use url::Url;

use qiaoliang::publish::{Credentials, ImageMonkeyApi};
use qiaoliang::task::{Action, AnnotateTask, Interrupt, PipelineConfig, PushTask, Task};

use common::{MockServer, annotation_xml, client, write_png};

fn prepare(root: &Path) {
  let annotations = root.join("Annotations/street");
  std::fs::create_dir_all(&annotations).unwrap();
  std::fs::write(
    annotations.join("a.xml"),
    annotation_xml("street", "a.jpg", &[("car", &[(40, 20), (60, 30)])]),
  )
  .unwrap();
  std::fs::write(
    annotations.join("b.xml"),
    annotation_xml("street", "b.jpg", &[("car", &[])]),
  )
  .unwrap();

  write_png(&root.join("cache/car/street_a.jpg"), 80, 40);
  write_png(&root.join("cache/car/street_b.jpg"), 10, 10);
}

fn config(root: &Path, action: Action) -> PipelineConfig {
  let mut config = PipelineConfig::new(root, "car", action).unwrap();
  config.archive = Url::parse("http://example.org/LabelMe/").unwrap();
  config.max_long_edge = 40;
  config
}

fn api(server: &MockServer) -> ImageMonkeyApi {
  ImageMonkeyApi::with_client(server.url.clone(), client()).with_credentials(Credentials {
    client_id: "id".to_string(),
    client_secret: "secret".to_string(),
  })
}

#[test]
fn push_donates_every_image_with_provenance() {
  let temp = tempfile::tempdir().expect("create temp dir");
  prepare(temp.path());
  let config = config(temp.path(), Action::Push);

  let server = MockServer::start(vec![(200, b"{}".to_vec()), (200, b"{}".to_vec())]);
  PushTask::new(api(&server), Interrupt::default())
    .run_task(&config.dataset(), &config)
    .unwrap();

  let (requests, extra) = server.finish();
  assert_eq!(requests.len(), 2);
  assert_eq!(extra, 0);
  for (request, name) in requests.iter().zip(["a.jpg", "b.jpg"]) {
    assert_eq!(
      request.request_line(),
      "POST /v1/internal/labelme/donate HTTP/1.1"
    );
    let source = format!("http://example.org/LabelMe/Images/street/{}\r\n", name);
    assert!(request.body_text().contains(&source));
  }
}

#[test]
fn push_stops_at_first_rejection() {
  let temp = tempfile::tempdir().expect("create temp dir");
  prepare(temp.path());
  let mut config = config(temp.path(), Action::Push);
  config.provenance = false;

  let server = MockServer::start(vec![(500, b"database unavailable".to_vec())]);
  let err = PushTask::new(api(&server), Interrupt::default())
    .run_task(&config.dataset(), &config)
    .unwrap_err();
  assert_eq!(err.root_cause().to_string(), "database unavailable");

  let (requests, extra) = server.finish();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].request_line(), "POST /v1/donate HTTP/1.1");
  assert_eq!(extra, 0);
}

#[test]
fn interrupted_push_sends_nothing() {
  let temp = tempfile::tempdir().expect("create temp dir");
  prepare(temp.path());
  let config = config(temp.path(), Action::Push);

  let interrupt = Interrupt::default();
  interrupt.trigger();
  let server = MockServer::start(Vec::new());
  PushTask::new(api(&server), interrupt)
    .run_task(&config.dataset(), &config)
    .unwrap();

  let (requests, extra) = server.finish();
  assert!(requests.is_empty());
  assert_eq!(extra, 0);
}

#[test]
fn annotate_scales_polygons_like_the_image() {
  let temp = tempfile::tempdir().expect("create temp dir");
  prepare(temp.path());
  let annotation = temp.path().join("Annotations/street/a.xml");
  let config = config(
    temp.path(),
    Action::Annotate {
      annotation: annotation.clone(),
      image_id: "42".to_string(),
    },
  );

  let server = MockServer::start(vec![(200, Vec::new())]);
  AnnotateTask::new(api(&server), annotation, "42".to_string())
    .run_task(&config.dataset(), &config)
    .unwrap();

  let (requests, _) = server.finish();
  assert_eq!(requests[0].request_line(), "POST /v1/annotate/42 HTTP/1.1");
  let json: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
  // 80x40 的图像缩到长边 40，系数 0.5
  assert_eq!(
    json["annotations"][0]["points"],
    serde_json::json!([{"x": 20, "y": 10}, {"x": 30, "y": 15}])
  );
}
