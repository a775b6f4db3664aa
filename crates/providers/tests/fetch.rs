use providers::fetch::ModelFetcher;
use std::fs;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fetch_downloads_model_and_preprocessor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/google/vit-base/resolve/main/config.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id2label":{}}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/google/vit-base/resolve/main/preprocessor_config.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"size":224}"#))
        .expect(1)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let fetcher = ModelFetcher::new(server.uri(), None);
    let files = vec![
        "config.json".to_string(),
        "preprocessor_config.json".to_string(),
    ];
    let paths = fetcher
        .fetch("google/vit-base", "main", &files, out.path())
        .await
        .unwrap();

    let model_dir = out.path().join("google--vit-base");
    assert_eq!(
        paths,
        vec![
            model_dir.join("config.json"),
            model_dir.join("preprocessor_config.json")
        ]
    );
    assert_eq!(
        fs::read_to_string(model_dir.join("preprocessor_config.json")).unwrap(),
        r#"{"size":224}"#
    );
    assert!(!model_dir.join("config.json.part").exists());
}

#[tokio::test]
async fn fetch_skips_files_already_present() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("new"))
        .expect(0)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let model_dir = ModelFetcher::model_dir(out.path(), "org/model");
    fs::create_dir_all(&model_dir).unwrap();
    fs::write(model_dir.join("config.json"), "cached").unwrap();

    let fetcher = ModelFetcher::new(server.uri(), None);
    fetcher
        .fetch("org/model", "main", &["config.json".to_string()], out.path())
        .await
        .unwrap();
    assert_eq!(
        fs::read_to_string(model_dir.join("config.json")).unwrap(),
        "cached"
    );
}

#[tokio::test]
async fn fetch_fails_on_missing_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let fetcher = ModelFetcher::new(server.uri(), None);
    let result = fetcher
        .fetch("org/model", "main", &["model.safetensors".to_string()], out.path())
        .await;
    assert!(result.is_err());
    assert!(!ModelFetcher::model_dir(out.path(), "org/model")
        .join("model.safetensors")
        .exists());
}
