use actix_web::web;

use crate::handlers::wallet::{
    get_alerts_handler, get_balance_handler, get_nfts_handler, get_tokens_handler,
    get_transactions_handler, get_watched_wallets_handler, unwatch_wallet_handler,
    watch_wallet_handler,
};

pub fn configure_wallet_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/wallet/{address}/balance",
        web::get().to(get_balance_handler),
    )
    .route(
        "/wallet/{address}/transactions",
        web::get().to(get_transactions_handler),
    )
    .route("/wallet/{address}/tokens", web::get().to(get_tokens_handler))
    .route("/wallet/{address}/nfts", web::get().to(get_nfts_handler))
    .route("/wallets/watch", web::post().to(watch_wallet_handler))
    .route(
        "/wallets/watch/{address}",
        web::delete().to(unwatch_wallet_handler),
    )
    .route(
        "/wallets/watched",
        web::get().to(get_watched_wallets_handler),
    )
    .route("/wallets/alerts", web::get().to(get_alerts_handler));
}
