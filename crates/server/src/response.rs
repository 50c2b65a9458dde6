use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use pagepress_render::Pdf;

/// A PDF served as a download.
pub struct PdfResponse {
    pdf: Pdf,
    filename: String,
}

impl PdfResponse {
    /// `filename` is the stem; `.pdf` is appended.
    pub fn new(pdf: Pdf, filename: &str) -> Self {
        Self { pdf, filename: format!("{filename}.pdf") }
    }
}

impl IntoResponse for PdfResponse {
    fn into_response(self) -> Response {
        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", self.filename))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"document.pdf\""));
        let length = HeaderValue::from(self.pdf.len());
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
                (header::CONTENT_DISPOSITION, disposition),
                (header::CONTENT_LENGTH, length),
            ],
            self.pdf.into_bytes(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_headers() {
        let pdf = Pdf::from(b"%PDF-1.7\n".to_vec());
        let response = PdfResponse::new(pdf, "invoice").into_response();
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(headers[header::CONTENT_DISPOSITION], "attachment; filename=\"invoice.pdf\"");
        assert_eq!(headers[header::CONTENT_LENGTH], "9");
    }
}
