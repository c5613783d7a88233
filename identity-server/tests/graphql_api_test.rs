// identity-server/tests/graphql_api_test.rs
use actix::Actor;
use actix_web::{http::StatusCode, test, web, App};
use common::messages::{
    CONNECT_WALLET, CONNECT_WALLET_MUTATION, CREATE_CLIENT, CREATE_CLIENT_MUTATION,
    CREATE_FREELANCER, CREATE_FREELANCER_MUTATION, GET_ROLE, GET_ROLE_QUERY, GET_SIGN_MESSAGE,
    GET_SIGN_MESSAGE_QUERY, UNAUTHENTICATED,
};
use common::{wallet_address_from_owner, Config};
use identity_server::registry::AccountRegistryActor;
use rand::rngs::OsRng;
use rsa::pss::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use sha2::Sha256;

struct TestWallet {
    key: RsaPrivateKey,
    owner: String,
    address: String,
}

impl TestWallet {
    fn generate() -> Self {
        let key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let owner = base64::encode_config(key.n().to_bytes_be(), base64::URL_SAFE_NO_PAD);
        let address = wallet_address_from_owner(&owner).unwrap();
        Self { key, owner, address }
    }

    fn sign(&self, message: &str) -> String {
        let signer = SigningKey::<Sha256>::new_with_salt_len(self.key.clone(), 32);
        base64::encode(signer.sign_with_rng(&mut OsRng, message.as_bytes()).to_vec())
    }
}

fn graphql(operation: &str, query: &str, variables: Value, token: Option<&str>) -> test::TestRequest {
    let mut req = test::TestRequest::post().uri("/graphql").set_json(json!({
        "query": query,
        "operationName": operation,
        "variables": variables,
    }));
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {}", token)));
    }
    req
}

fn sign_message_request(address: &str) -> test::TestRequest {
    graphql(
        GET_SIGN_MESSAGE,
        GET_SIGN_MESSAGE_QUERY,
        json!({ "walletAddress": address }),
        None,
    )
}

fn connect_request(wallet: &TestWallet, signature: &str) -> test::TestRequest {
    graphql(
        CONNECT_WALLET,
        CONNECT_WALLET_MUTATION,
        json!({
            "walletAddress": wallet.address,
            "publicKey": wallet.owner,
            "signature": signature,
        }),
        None,
    )
}

#[actix_web::test]
async fn test_login_then_bind_role() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AccountRegistryActor::new().start()))
            .app_data(web::Data::new(Config::default()))
            .configure(identity_server::api::configure),
    )
    .await;
    let wallet = TestWallet::generate();

    let resp: Value = test::call_and_read_body_json(&app, sign_message_request(&wallet.address).to_request()).await;
    let message = resp["data"]["getSignMessage"].as_str().unwrap().to_string();
    assert!(message.contains(&wallet.address));

    let resp: Value =
        test::call_and_read_body_json(&app, connect_request(&wallet, &wallet.sign(&message)).to_request()).await;
    let session = &resp["data"]["connectWallet"];
    assert_eq!(session["walletAddress"], wallet.address.as_str());
    assert!(session["_id"].as_str().is_some());
    let token = session["token"].as_str().unwrap().to_string();

    let resp: Value =
        test::call_and_read_body_json(&app, graphql(GET_ROLE, GET_ROLE_QUERY, json!({}), Some(&token)).to_request())
            .await;
    assert_eq!(resp["data"]["getRole"]["success"], true);
    assert!(resp["data"]["getRole"]["role"].is_null());

    let resp: Value = test::call_and_read_body_json(
        &app,
        graphql(CREATE_CLIENT, CREATE_CLIENT_MUTATION, json!({}), Some(&token)).to_request(),
    )
    .await;
    assert_eq!(resp["data"]["createClient"]["success"], true);

    let resp: Value =
        test::call_and_read_body_json(&app, graphql(GET_ROLE, GET_ROLE_QUERY, json!({}), Some(&token)).to_request())
            .await;
    assert_eq!(resp["data"]["getRole"]["role"], "Client");

    let resp: Value = test::call_and_read_body_json(
        &app,
        graphql(CREATE_FREELANCER, CREATE_FREELANCER_MUTATION, json!({}), Some(&token)).to_request(),
    )
    .await;
    assert_eq!(resp["data"]["createFreelancer"]["success"], false);
    assert_eq!(resp["data"]["createFreelancer"]["code"], "409");
}

#[actix_web::test]
async fn test_challenge_cannot_be_replayed() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AccountRegistryActor::new().start()))
            .app_data(web::Data::new(Config::default()))
            .configure(identity_server::api::configure),
    )
    .await;
    let wallet = TestWallet::generate();

    let resp: Value = test::call_and_read_body_json(&app, sign_message_request(&wallet.address).to_request()).await;
    let signature = wallet.sign(resp["data"]["getSignMessage"].as_str().unwrap());

    let first: Value = test::call_and_read_body_json(&app, connect_request(&wallet, &signature).to_request()).await;
    assert!(first["data"]["connectWallet"]["token"].is_string());

    let replay: Value = test::call_and_read_body_json(&app, connect_request(&wallet, &signature).to_request()).await;
    assert!(replay["data"].is_null());
    assert_eq!(replay["errors"][0]["message"], "No pending sign message for this wallet");
}

#[actix_web::test]
async fn test_signature_from_other_key_is_rejected() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AccountRegistryActor::new().start()))
            .app_data(web::Data::new(Config::default()))
            .configure(identity_server::api::configure),
    )
    .await;
    let wallet = TestWallet::generate();
    let intruder = TestWallet::generate();

    let resp: Value = test::call_and_read_body_json(&app, sign_message_request(&wallet.address).to_request()).await;
    let message = resp["data"]["getSignMessage"].as_str().unwrap().to_string();

    let resp: Value =
        test::call_and_read_body_json(&app, connect_request(&wallet, &intruder.sign(&message)).to_request()).await;
    assert_eq!(resp["errors"][0]["message"], "Invalid signature");

    // challenge was consumed by the failed attempt
    let resp: Value =
        test::call_and_read_body_json(&app, connect_request(&wallet, &wallet.sign(&message)).to_request()).await;
    assert_eq!(resp["errors"][0]["message"], "No pending sign message for this wallet");
}

#[actix_web::test]
async fn test_foreign_key_does_not_burn_the_challenge() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AccountRegistryActor::new().start()))
            .app_data(web::Data::new(Config::default()))
            .configure(identity_server::api::configure),
    )
    .await;
    let wallet = TestWallet::generate();
    let intruder = TestWallet::generate();

    let resp: Value = test::call_and_read_body_json(&app, sign_message_request(&wallet.address).to_request()).await;
    let message = resp["data"]["getSignMessage"].as_str().unwrap().to_string();

    let forged = graphql(
        CONNECT_WALLET,
        CONNECT_WALLET_MUTATION,
        json!({
            "walletAddress": wallet.address,
            "publicKey": intruder.owner,
            "signature": intruder.sign(&message),
        }),
        None,
    );
    let resp: Value = test::call_and_read_body_json(&app, forged.to_request()).await;
    assert_eq!(resp["errors"][0]["message"], "Wallet address does not match public key");

    let resp: Value =
        test::call_and_read_body_json(&app, connect_request(&wallet, &wallet.sign(&message)).to_request()).await;
    assert!(resp["errors"].is_null());
    assert_eq!(resp["data"]["connectWallet"]["walletAddress"], wallet.address.as_str());
}

#[actix_web::test]
async fn test_role_queries_require_a_valid_token() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AccountRegistryActor::new().start()))
            .app_data(web::Data::new(Config::default()))
            .configure(identity_server::api::configure),
    )
    .await;

    let resp = test::call_service(&app, graphql(GET_ROLE, GET_ROLE_QUERY, json!({}), None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["extensions"]["code"], UNAUTHENTICATED);

    let resp = test::call_service(
        &app,
        graphql(CREATE_CLIENT, CREATE_CLIENT_MUTATION, json!({}), Some("not-a-jwt")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_unknown_operation_and_missing_variables() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AccountRegistryActor::new().start()))
            .app_data(web::Data::new(Config::default()))
            .configure(identity_server::api::configure),
    )
    .await;

    let resp = test::call_service(&app, graphql("DropTables", "mutation DropTables { x }", json!({}), None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, graphql(GET_SIGN_MESSAGE, GET_SIGN_MESSAGE_QUERY, json!({}), None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["message"], "Missing variable: walletAddress");
}

#[actix_web::test]
async fn test_status_reports_metrics() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AccountRegistryActor::new().start()))
            .app_data(web::Data::new(Config::default()))
            .configure(identity_server::api::configure),
    )
    .await;

    let _: Value = test::call_and_read_body_json(&app, sign_message_request("addr").to_request()).await;

    let resp: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/status").to_request()).await;
    assert_eq!(resp["status"], "ok");
    assert_eq!(resp["metrics"]["pending_challenges"], 1);
    assert_eq!(resp["metrics"]["challenges_issued"], 1);
}
