//! Commission API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /calculate-appointment | POST | 预览某个预约的佣金 |
//! | /create | POST | 手动创建 (服务或商品) |
//! | /barber/{id} | GET | 理发师佣金列表 |
//! | /barber/{id}/summary | GET | 汇总与环比 |
//! | /all | GET | 全部佣金 |
//! | /summary | GET | 全店汇总 (按理发师) |
//! | /auto-generate | POST | 为所有已完成预约补齐佣金 |
//! | /generate-for-appointment/{id} | POST | 为单个预约生成佣金 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/v1/commissions", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/calculate-appointment", post(handler::calculate_appointment))
        .route("/create", post(handler::create))
        .route("/barber/{id}", get(handler::list_by_barber))
        .route("/barber/{id}/summary", get(handler::barber_summary))
        .route("/all", get(handler::list_all))
        .route("/summary", get(handler::shop_summary))
        .route("/auto-generate", post(handler::auto_generate))
        .route(
            "/generate-for-appointment/{id}",
            post(handler::generate_for_appointment),
        )
}
