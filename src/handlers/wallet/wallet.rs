use actix_web::{web, HttpResponse};
use log::{error, info, warn};

use crate::{
    errors::{ApiError, WalletError},
    handlers::auth::ApiKey,
    handlers::wallet::dto::{TransactionsQuery, WatchWalletRequest, WatchWalletResponse},
    services::wallet::{WalletService, DEFAULT_TRANSACTION_LIMIT},
};

fn failure(action: &str, address: &str, error: WalletError) -> ApiError {
    match &error {
        WalletError::InvalidAddress(_) | WalletError::InvalidInput(_) => {
            warn!("Rejected {} for {}: {}", action, address, error)
        }
        _ => error!("Failed to {} for {}: {}", action, address, error),
    }
    error.into()
}

/// GET /wallet/{address}/balance - Native balance of a wallet
pub async fn get_balance_handler(
    service: web::Data<WalletService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let address = path.into_inner();
    info!("Handling GET /wallet/{}/balance request", address);

    match service.get_balance(&address).await {
        Ok(balance) => Ok(HttpResponse::Ok().json(balance)),
        Err(e) => Err(failure("fetch balance", &address, e)),
    }
}

/// GET /wallet/{address}/transactions?limit= - Recent transactions, newest first
pub async fn get_transactions_handler(
    service: web::Data<WalletService>,
    path: web::Path<String>,
    query: web::Query<TransactionsQuery>,
) -> Result<HttpResponse, ApiError> {
    let address = path.into_inner();
    let limit = query.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT);
    info!(
        "Handling GET /wallet/{}/transactions request (limit {})",
        address, limit
    );

    match service.get_transactions(&address, limit).await {
        Ok(list) => {
            info!(
                "Successfully retrieved {} transactions",
                list.transactions.len()
            );
            Ok(HttpResponse::Ok().json(list))
        }
        Err(e) => Err(failure("fetch transactions", &address, e)),
    }
}

/// GET /wallet/{address}/tokens - Fungible token balances
pub async fn get_tokens_handler(
    service: web::Data<WalletService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let address = path.into_inner();
    info!("Handling GET /wallet/{}/tokens request", address);

    match service.get_token_balances(&address).await {
        Ok(tokens) => {
            info!("Successfully retrieved {} tokens", tokens.len());
            Ok(HttpResponse::Ok().json(tokens))
        }
        Err(e) => Err(failure("fetch tokens", &address, e)),
    }
}

/// GET /wallet/{address}/nfts - NFTs owned by a wallet
pub async fn get_nfts_handler(
    service: web::Data<WalletService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let address = path.into_inner();
    info!("Handling GET /wallet/{}/nfts request", address);

    match service.get_nfts(&address).await {
        Ok(nfts) => {
            info!("Successfully retrieved {} NFTs", nfts.len());
            Ok(HttpResponse::Ok().json(nfts))
        }
        Err(e) => Err(failure("fetch NFTs", &address, e)),
    }
}

/// POST /wallets/watch - Add a wallet to the watchlist
/// Requires API key authentication via X-API-Key header when one is configured
pub async fn watch_wallet_handler(
    _api_key: ApiKey,
    service: web::Data<WalletService>,
    body: web::Json<WatchWalletRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    info!("Handling POST /wallets/watch request for {}", request.address);

    match service.watch_wallet(&request.address, request.label).await {
        Ok(wallet) => Ok(HttpResponse::Created().json(WatchWalletResponse {
            success: true,
            address: wallet.address,
        })),
        Err(e) => Err(failure("watch wallet", &request.address, e)),
    }
}

/// DELETE /wallets/watch/{address} - Remove a wallet from the watchlist
pub async fn unwatch_wallet_handler(
    _api_key: ApiKey,
    service: web::Data<WalletService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let address = path.into_inner();
    info!("Handling DELETE /wallets/watch/{} request", address);

    match service.unwatch_wallet(&address).await {
        Ok(true) => Ok(HttpResponse::Ok().json(WatchWalletResponse {
            success: true,
            address,
        })),
        Ok(false) => Err(ApiError::NotFound(format!(
            "Wallet {} is not being watched",
            address
        ))),
        Err(e) => Err(failure("unwatch wallet", &address, e)),
    }
}

/// GET /wallets/watched - Watched wallets with live balances
pub async fn get_watched_wallets_handler(
    service: web::Data<WalletService>,
) -> Result<HttpResponse, ApiError> {
    info!("Handling GET /wallets/watched request");

    match service.get_watched_wallets().await {
        Ok(report) => Ok(HttpResponse::Ok().json(report)),
        Err(e) => Err(failure("evaluate watchlist", "all wallets", e)),
    }
}

/// GET /wallets/alerts - Balance change history, newest first
pub async fn get_alerts_handler(
    service: web::Data<WalletService>,
) -> Result<HttpResponse, ApiError> {
    info!("Handling GET /wallets/alerts request");

    match service.get_alerts().await {
        Ok(alerts) => {
            info!("Successfully retrieved {} alerts", alerts.len());
            Ok(HttpResponse::Ok().json(alerts))
        }
        Err(e) => Err(failure("fetch alerts", "all wallets", e)),
    }
}
