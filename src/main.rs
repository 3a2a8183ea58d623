use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    uma_ocr_lib::run().await
}
