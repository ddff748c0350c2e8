use axum::{extract::Path, response::Json};

use crate::{
    middleware::Caller,
    utils::barcode::{self, GeneratedBarcode},
};

pub async fn generate_barcode(
    _caller: Caller,
    Path(format): Path<String>,
) -> Json<GeneratedBarcode> {
    Json(barcode::generate(&format))
}
