use std::net::SocketAddr;

use axum::{routing::get, Router};
use expkit_designs::{load_designs_and_itis, try_load, DirSource, FetchError, HttpSource};

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });
    addr
}

#[tokio::test]
async fn loads_itis_and_named_files_over_http() {
    let app = Router::new()
        .route("/designs/design_4/ITIs.txt", get(|| async { "0.0\n2.5\n1.0" }))
        .route("/designs/design_4/stims.txt", get(|| async { "go\ngo\nstop" }))
        .route("/designs/design_4/conds.txt", get(|| async { "a\nb" }));
    let addr = serve(app).await;
    let source = HttpSource::new(&format!("http://{addr}/designs")).expect("source");

    let files = load_designs_and_itis(&source, 4, &["stims", "conds"]).await;

    assert_eq!(files.itis, vec!["0.0", "2.5", "1.0"]);
    assert_eq!(
        files.get("stims").map(<[String]>::to_vec),
        Some(vec!["go".to_owned(), "go".to_owned(), "stop".to_owned()])
    );
    assert_eq!(files.get("conds").map(<[String]>::len), Some(2));
}

#[tokio::test]
async fn missing_itis_fails_closed() {
    let app = Router::new().route("/design_1/stims.txt", get(|| async { "go" }));
    let addr = serve(app).await;
    let source = HttpSource::new(&format!("http://{addr}/")).expect("source");

    let files = load_designs_and_itis(&source, 1, &["stims"]).await;
    assert!(files.itis.is_empty());
    assert_eq!(files.get("stims").map(<[String]>::len), Some(0));

    match try_load(&source, 1, &["stims"]).await {
        Err(FetchError::Status { status, url }) => {
            assert_eq!(status.as_u16(), 404);
            assert!(url.ends_with("/design_1/ITIs.txt"));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn reads_design_directory() {
    let root = std::env::temp_dir().join(format!("expkit-designs-{}", std::process::id()));
    let dir = root.join("design_2");
    tokio::fs::create_dir_all(&dir).await.expect("mkdir");
    tokio::fs::write(dir.join("ITIs.txt"), "1\n2\n3").await.expect("write");
    tokio::fs::write(dir.join("stims.txt"), "stop").await.expect("write");

    let source = DirSource::new(&root);
    let files = load_designs_and_itis(&source, 2, &["stims"]).await;
    let missing = load_designs_and_itis(&source, 2, &["stims", "absent"]).await;
    tokio::fs::remove_dir_all(&root).await.expect("cleanup");

    assert_eq!(files.itis, vec!["1", "2", "3"]);
    assert_eq!(files.get("stims").map(<[String]>::to_vec), Some(vec!["stop".to_owned()]));
    assert!(missing.is_empty());
}
