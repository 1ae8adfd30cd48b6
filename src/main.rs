use clap::Parser;
use teambuilder::cli::{
    Args, build_config, handle_create_admin, init_logging, load_token_secret, open_database,
    validate_public_origin,
};
use teambuilder::mail::MailDispatcher;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(access_secret) =
        load_token_secret("ACCESS_TOKEN_SECRET", args.access_secret_file.as_deref())
    else {
        std::process::exit(1);
    };

    let Some(refresh_secret) =
        load_token_secret("REFRESH_TOKEN_SECRET", args.refresh_secret_file.as_deref())
    else {
        std::process::exit(1);
    };

    let Some(secure_cookies) = validate_public_origin(&args.public_origin) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.create_admin.as_deref() {
        handle_create_admin(&db, email).await;
    }

    teambuilder::init_cleanup(&db).await;

    let mail = MailDispatcher::new(args.mail_service_url, args.mail_service_token);
    let config = build_config(
        db,
        access_secret,
        refresh_secret,
        secure_cookies,
        mail,
        !args.no_rate_limit,
    );

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();
    info!(address = %local_addr, "Listening");

    if let Err(e) = teambuilder::run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
