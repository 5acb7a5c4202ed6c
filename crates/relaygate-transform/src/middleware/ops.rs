use super::generate::{transform_generate_request, transform_generate_response};
use super::types::{Request, Response, TransformContext, TransformError};

pub fn transform_request(ctx: &TransformContext, req: Request) -> Result<Request, TransformError> {
    match req {
        Request::GenerateContent(req) => transform_generate_request(ctx, req),
    }
}

pub fn transform_response(
    ctx: &TransformContext,
    resp: Response,
) -> Result<Response, TransformError> {
    match resp {
        Response::GenerateContent(resp) => transform_generate_response(ctx, resp),
    }
}
