use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Request, Response};
use rocket::http::Header;

/// Adds CORS headers for one configured origin.
pub struct CORS {
    pub allowed_origin: String,
}

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let Some(origin) = req.headers().get_one("Origin") else { return };

        if origin == self.allowed_origin {
            res.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
            res.set_header(Header::new("Access-Control-Allow-Methods", "POST, DELETE, OPTIONS"));
            res.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
            res.set_header(Header::new("Access-Control-Max-Age", "86400"));
        }
    }
}
