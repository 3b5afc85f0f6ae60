use std::time::Duration;

use axum::{
    extract::Path,
    http::{HeaderMap, Method, StatusCode},
    response::Redirect,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub const AUTH_TOKEN: &str = "token@12345";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colour {
    pub id: u32,
    pub name: String,
    pub year: u32,
    pub color: String,
    pub pantone_value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Support {
    pub url: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColourResource {
    pub data: Colour,
    pub support: Support,
}

/// What `/echo` saw: the method, every header in arrival order, and the raw body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echoed {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Echoed {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub fn fuchsia_rose() -> ColourResource {
    ColourResource {
        data: Colour {
            id: 2,
            name: "fuchsia rose".to_string(),
            year: 2001,
            color: "#C74375".to_string(),
            pantone_value: "17-2031".to_string(),
        },
        support: Support {
            url: "https://reqres.in/#support-heading".to_string(),
            text: "To keep ReqRes free, contributions towards server costs are appreciated!"
                .to_string(),
        },
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/specific-code", any(specific_code))
        .route("/get", get(get_colour))
        .route("/post", any(|method: Method| expect_method(method, Method::POST)))
        .route("/put", any(|method: Method| expect_method(method, Method::PUT)))
        .route("/patch", any(|method: Method| expect_method(method, Method::PATCH)))
        .route("/delete", any(|method: Method| expect_method(method, Method::DELETE)))
        .route("/post-auth-data", any(post_auth_data))
        .route("/post-auth-token", any(post_auth_token))
        .route("/echo", any(echo))
        .route("/slow/{millis}", any(slow))
        .route("/empty", any(|| async { StatusCode::OK }))
        .route("/malformed", any(|| async { (StatusCode::OK, "not json") }))
        .route("/redirect", get(|| async { Redirect::to("/get") }))
        .fallback(|| async { StatusCode::NOT_FOUND })
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn specific_code() -> StatusCode {
    StatusCode::from_u16(228).unwrap_or(StatusCode::OK)
}

async fn get_colour() -> Json<ColourResource> {
    Json(fuchsia_rose())
}

async fn expect_method(actual: Method, expected: Method) -> StatusCode {
    if actual == expected {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn post_auth_data(method: Method, body: String) -> StatusCode {
    if method == Method::POST
        && body.contains(r#""login":"login""#)
        && body.contains(r#""password":"password""#)
    {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn post_auth_token(method: Method, headers: HeaderMap) -> StatusCode {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == AUTH_TOKEN);
    if method == Method::POST && authorized {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echoed> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echoed {
        method: method.as_str().to_string(),
        headers,
        body,
    })
}

async fn slow(Path(millis): Path<u64>) -> StatusCode {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colour_resource_serializes_with_expected_field_names() {
        let json = serde_json::to_value(fuchsia_rose()).unwrap();
        assert_eq!(json["data"]["id"], 2);
        assert_eq!(json["data"]["name"], "fuchsia rose");
        assert_eq!(json["data"]["pantone_value"], "17-2031");
        assert_eq!(json["support"]["url"], "https://reqres.in/#support-heading");
    }

    #[test]
    fn echoed_header_lookup_ignores_case() {
        let echoed = Echoed {
            method: "GET".to_string(),
            headers: vec![("authorization".to_string(), AUTH_TOKEN.to_string())],
            body: String::new(),
        };
        assert_eq!(echoed.header("Authorization"), Some(AUTH_TOKEN));
        assert_eq!(echoed.header("x-missing"), None);
    }

    #[test]
    fn echoed_headers_serialize_as_pairs() {
        let echoed = Echoed {
            method: "POST".to_string(),
            headers: vec![("x-a".to_string(), "1".to_string())],
            body: "hi".to_string(),
        };
        let json = serde_json::to_value(&echoed).unwrap();
        assert_eq!(json["headers"][0][0], "x-a");
        assert_eq!(json["headers"][0][1], "1");
    }
}
