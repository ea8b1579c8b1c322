use pictoboard_backend::{
    errors::{ImageError, StorageError},
    repositories::{media::MediaReader, object_store::ObjectStore},
    storage::{media_reader::HttpMediaReader, supabase::SupabaseStorage},
};
use reqwest::Client;
use serde_json::json;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const LIMIT: usize = 1024;

fn storage(server: &MockServer) -> SupabaseStorage {
    SupabaseStorage::with_client(Client::new(), &format!("{}/storage/v1", server.uri()), "service-key")
}

#[tokio::test]
async fn put_object_posts_bytes_with_service_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/gestos/u1/gesture_1_abc.png"))
        .and(header("authorization", "Bearer service-key"))
        .and(header("apikey", "service-key"))
        .and(header("content-type", "image/png"))
        .and(header("x-upsert", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "gestos/u1/gesture_1_abc.png" })))
        .expect(1)
        .mount(&server)
        .await;

    storage(&server)
        .put_object("gestos", "u1/gesture_1_abc.png", vec![1, 2, 3], "image/png", true)
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_write_carries_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "statusCode": "403",
            "error": "Unauthorized",
            "message": "new row violates row-level security policy"
        })))
        .mount(&server)
        .await;

    let err = storage(&server)
        .put_object("avatars", "u1/a.png", vec![1], "image/png", true)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StorageError::Rejected {
            status: 400,
            message: "new row violates row-level security policy".into()
        }
    );
}

#[tokio::test]
async fn remove_objects_sends_prefixes() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/avatars"))
        .and(body_json(json!({ "prefixes": ["u1/avatar_1_abc.png"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    storage(&server)
        .remove_objects("avatars", vec!["u1/avatar_1_abc.png".into()])
        .await
        .unwrap();
}

#[tokio::test]
async fn remote_fetch_keeps_reported_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cat.webp"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/webp")
                .set_body_bytes(vec![7u8; 16]),
        )
        .mount(&server)
        .await;
    let reader = HttpMediaReader::with_client(Client::new(), "/nonexistent", LIMIT).allow_hosts(["127.0.0.1"]);

    let fetched = reader.fetch_remote(&format!("{}/cat.webp", server.uri())).await.unwrap();

    assert_eq!(fetched.bytes, vec![7u8; 16]);
    assert_eq!(fetched.content_type.as_deref(), Some("image/webp"));
}

#[tokio::test]
async fn remote_fetch_error_status_is_a_read_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let reader = HttpMediaReader::with_client(Client::new(), "/nonexistent", LIMIT).allow_hosts(["127.0.0.1"]);

    let err = reader.fetch_remote(&format!("{}/gone.png", server.uri())).await.unwrap_err();

    assert!(matches!(err, ImageError::ReadFailed(msg) if msg.contains("404")));
}

#[tokio::test]
async fn oversized_remote_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/huge.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; LIMIT + 1]))
        .mount(&server)
        .await;
    let reader = HttpMediaReader::with_client(Client::new(), "/nonexistent", LIMIT).allow_hosts(["127.0.0.1"]);

    let err = reader.fetch_remote(&format!("{}/huge.png", server.uri())).await.unwrap_err();

    assert!(matches!(err, ImageError::TooLarge { size, limit } if size > LIMIT && limit == LIMIT));
}

#[tokio::test]
async fn loopback_host_is_refused_without_allowlist() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 8]))
        .expect(0)
        .mount(&server)
        .await;
    let reader = HttpMediaReader::with_client(Client::new(), "/nonexistent", LIMIT);

    let err = reader.fetch_remote(&format!("{}/cat.png", server.uri())).await.unwrap_err();

    assert!(matches!(err, ImageError::ForbiddenHost(host) if host == "127.0.0.1"));
}

#[tokio::test]
async fn oversized_local_file_is_rejected() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("big.png"), vec![0u8; LIMIT + 1]).unwrap();
    let reader = HttpMediaReader::with_client(Client::new(), root.path(), LIMIT);

    assert!(matches!(
        reader.read_local("file:///big.png").await,
        Err(ImageError::TooLarge { limit, .. }) if limit == LIMIT
    ));
}

#[tokio::test]
async fn local_reads_stay_inside_media_root() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("media/external")).unwrap();
    std::fs::write(root.path().join("media/external/12"), b"jpeg-bytes").unwrap();
    let reader = HttpMediaReader::with_client(Client::new(), root.path(), LIMIT);

    let fetched = reader.read_local("content://media/external/12").await.unwrap();
    assert_eq!(fetched.bytes, b"jpeg-bytes");
    assert_eq!(fetched.content_type, None);

    assert!(matches!(
        reader.read_local("file:///missing.png").await,
        Err(ImageError::ReadFailed(_))
    ));
    assert!(matches!(
        reader.read_local("file:///../../etc/passwd").await,
        Err(ImageError::ForbiddenPath(_))
    ));
}
