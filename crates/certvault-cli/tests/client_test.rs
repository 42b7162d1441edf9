//! Client and subcommand tests against a mock certvault API.

use std::io::Write;

use certvault_cli::client::IssueRequest;
use certvault_cli::verify::VerifyArgs;
use certvault_cli::{CertvaultClient, ClientConfig, ClientError};
use certvault_core::{compute_digest, CertificateDigest, VerificationOutcome};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer, token: Option<&str>) -> CertvaultClient {
    CertvaultClient::new(&ClientConfig {
        server: mock_server.uri(),
        token: token.map(str::to_string),
        timeout_secs: 5,
    })
    .unwrap()
}

fn digest(c: char) -> CertificateDigest {
    CertificateDigest::parse(&c.to_string().repeat(64)).unwrap()
}

#[tokio::test]
async fn issue_sends_bearer_token_and_body() {
    let mock_server = MockServer::start().await;
    let hash = "a".repeat(64);

    Mock::given(method("POST"))
        .and(path("/certificates"))
        .and(header("authorization", "Bearer s3cret"))
        .and(body_json(serde_json::json!({
            "fileHash": hash,
            "studentName": "Alice"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "message": "Certificate recorded successfully"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, Some("s3cret"));
    let resp = client
        .issue(&IssueRequest {
            file_hash: hash,
            student_name: Some("Alice".into()),
            ..IssueRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(resp.message, "Certificate recorded successfully");
}

#[tokio::test]
async fn issue_surfaces_server_error_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/certificates"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": "DUPLICATE",
            "message": "Certificate already registered"
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    let err = client
        .issue(&IssueRequest {
            file_hash: "b".repeat(64),
            ..IssueRequest::default()
        })
        .await
        .unwrap_err();
    match err {
        ClientError::Api {
            status, message, ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Certificate already registered");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn verify_decodes_verified_outcome() {
    let mock_server = MockServer::start().await;
    let hash = digest('c');

    Mock::given(method("POST"))
        .and(path("/verify"))
        .and(body_json(serde_json::json!({
            "hash": hash.as_str(),
            "institution": "State University"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "VERIFIED",
            "certificate": {
                "hash": hash.as_str(),
                "studentName": "Alice",
                "registerNumber": null,
                "certificateName": "B.Sc.",
                "institution": "State University",
                "issueDate": null,
                "createdAt": "2026-01-15T12:00:00Z"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    let outcome = client
        .verify(&hash, Some("State University"))
        .await
        .unwrap();
    match outcome {
        VerificationOutcome::Verified { certificate } => {
            assert_eq!(certificate.hash, hash);
            assert_eq!(certificate.student_name.as_deref(), Some("Alice"));
        }
        other => panic!("expected VERIFIED, got {other:?}"),
    }
}

#[tokio::test]
async fn verify_treats_unrecognized_body_as_error_outcome() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy page</html>"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    let outcome = client.verify(&digest('d'), None).await.unwrap();
    assert!(matches!(outcome, VerificationOutcome::Error { .. }));
    assert!(!outcome.is_verified());
}

#[tokio::test]
async fn verify_command_hashes_file_and_prints_summary() {
    let mock_server = MockServer::start().await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"forged certificate").unwrap();
    let expected = compute_digest(b"forged certificate");

    Mock::given(method("POST"))
        .and(path("/verify"))
        .and(body_json(serde_json::json!({"hash": expected.as_str()})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "TAMPERED",
            "message": "Certificate hash not found"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    let mut out = Vec::new();
    let outcome = certvault_cli::verify::run(
        &client,
        VerifyArgs {
            file: Some(file.path().to_path_buf()),
            hash: None,
            institution: None,
            json: false,
        },
        &mut out,
    )
    .await
    .unwrap();

    assert!(matches!(outcome, VerificationOutcome::Tampered { .. }));
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.starts_with("TAMPERED"));
    assert!(printed.contains("Certificate hash not found"));
}

#[tokio::test]
async fn server_path_prefix_is_preserved() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "TAMPERED",
            "message": "Certificate hash not found"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CertvaultClient::new(&ClientConfig {
        server: format!("{}/api", mock_server.uri()),
        token: None,
        timeout_secs: 5,
    })
    .unwrap();
    let outcome = client.verify(&digest('e'), None).await.unwrap();
    assert!(matches!(outcome, VerificationOutcome::Tampered { .. }));
}
