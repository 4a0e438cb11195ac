//! Appointment API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/v1/appointments | POST / GET | 预约 / 列表 (按角色限定范围) |
//! | /api/v1/appointments/my-appointments | GET | 当前用户的预约 |
//! | /api/v1/appointments/availability | GET | 时段网格 |
//! | /api/v1/appointments/by-code/{code} | GET | 按预约码查询 (公开) |
//! | /api/v1/appointments/{id} | GET / PUT / DELETE | 详情 / 修改 / 取消 |
//! | /api/v1/appointments/{id}/status-simple | PUT | 通用状态流转 |
//! | /api/v1/appointments/{id}/{action} | POST | confirm, start, pause, resume, complete, no-show, reschedule |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/v1/appointments", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/my-appointments", get(handler::my_appointments))
        .route("/availability", get(handler::availability))
        .route("/by-code/{code}", get(handler::get_by_code))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .put(handler::update)
                .delete(handler::cancel),
        )
        .route("/{id}/status-simple", put(handler::status_simple))
        .route("/{id}/confirm", post(handler::confirm))
        .route("/{id}/start", post(handler::start))
        .route("/{id}/pause", post(handler::pause))
        .route("/{id}/resume", post(handler::resume))
        .route("/{id}/complete", post(handler::complete))
        .route("/{id}/no-show", post(handler::no_show))
        .route("/{id}/reschedule", post(handler::reschedule))
}
