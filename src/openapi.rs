use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Auction Lab API",
        description = "Uniform-price call-auction experiment server"
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::registration::register,
        crate::handlers::registration::submit_survey,
        crate::handlers::auction::submit_orders,
        crate::handlers::auction::get_round_result,
        crate::handlers::auction::get_participant_info,
        crate::handlers::auction::get_token_balance,
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "auction", description = "Call-auction experiment endpoints")
    )
)]
pub struct ApiDoc;
