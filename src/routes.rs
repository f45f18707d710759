use crate::{
    api::{attendance, users},
    auth::{handlers, middleware::session_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    // both values are non-zero, which is all `finish` checks
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero rate limiter quota");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes: every handler below sees a resolved identity
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(session_middleware))
            .wrap(protected_limiter)
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(web::resource("/checkin").route(web::post().to(attendance::check_in)))
            .service(web::resource("/checkout").route(web::post().to(attendance::check_out)))
            .service(
                web::scope("/attendance")
                    .service(web::resource("/history").route(web::get().to(attendance::history)))
                    .service(web::resource("/today").route(web::get().to(attendance::today))),
            )
            .service(
                web::scope("/users")
                    // /users
                    .service(
                        web::resource("")
                            .route(web::get().to(users::list_users))
                            .route(web::post().to(users::create_user)),
                    )
                    // /users/{id}
                    .service(web::resource("/{id}").route(web::delete().to(users::delete_user))),
            ),
    );
}

// LOGIN
//  └─ opaque session token (1 hour), cookie `sid` + JSON body

// API REQUEST
//  └─ Cookie: sid=<token>  or  Authorization: Bearer <token>

// LOGOUT / USER DELETED / EXPIRED
//  └─ token stops resolving, 401 on the protected scope
