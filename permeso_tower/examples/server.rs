use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use permeso::{DenialMode, Guard, Principal, ScopePolicy};
use permeso_tower::RequireScope;

// Stand-in for a real authentication layer: trusts an `x-demo-scopes`
// header and attaches the resulting principal to the request.
async fn attach_principal(mut request: Request, next: Next) -> Response {
    let scopes = request
        .headers()
        .get("x-demo-scopes")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let principal = Principal::new()
        .with_subject("demo-user")
        .with_attribute("scope", scopes);
    request.extensions_mut().insert(principal);

    next.run(request).await
}

async fn list_widgets() -> &'static str {
    "every widget we have"
}

async fn create_widget() -> &'static str {
    "created a widget"
}

#[tokio::main]
async fn main() {
    let read = Guard::new(ScopePolicy::any_of_static("read"));

    // Denials on this route are forwarded; the default handler renders
    // them as a JSON descriptor instead of a bearer challenge.
    let write = Guard::new(ScopePolicy::all_of_static("read write"))
        .with_denial_mode(DenialMode::Forward);

    let app = Router::new()
        .route(
            "/widgets",
            get(list_widgets).layer(RequireScope::layer(read)),
        )
        .route(
            "/widgets/new",
            post(create_widget).layer(RequireScope::layer(write)),
        )
        .layer(middleware::from_fn(attach_principal));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .unwrap();
    println!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
