//! FastAPI, Flask, and Django.

mod common;

use common::{handler_of, pairs, routes, scan};
use routemap_analysis::Confidence;

#[test]
fn test_fastapi_router_prefix_and_include() {
    let scan = scan(
        "fastapi",
        r#"from fastapi import APIRouter, FastAPI

app = FastAPI()
router = APIRouter(prefix="/items", tags=["items"])


@router.get("/")
async def list_items():
    return []


@router.post("/{item_id}/tags")
async def add_tag(item_id: int):
    ...


@router.api_route("/sync", methods=["PUT", "PATCH"])
def sync():
    pass


@app.get("/health")
def health():
    return {"ok": True}


app.include_router(router, prefix="/api/v1")
"#,
    );
    assert_eq!(
        routes(&scan),
        pairs(&[
            ("GET", "/api/v1/items"),
            ("POST", "/api/v1/items/{item_id}/tags"),
            ("PUT", "/api/v1/items/sync"),
            ("PATCH", "/api/v1/items/sync"),
            ("GET", "/health"),
        ])
    );
    assert_eq!(handler_of(&scan, "POST", "/api/v1/items/{item_id}/tags"), Some("add_tag"));
    assert_eq!(scan.endpoints[0].line, 7);
}

#[test]
fn test_flask_blueprint_and_methods() {
    let scan = scan(
        "flask",
        r#"from flask import Blueprint, Flask

app = Flask(__name__)
bp = Blueprint("users", __name__, url_prefix="/users")


@bp.route("/<int:user_id>", methods=["GET", "DELETE"])
def user(user_id):
    return ""


@bp.post("/")
def create():
    return ""


@app.route("/about")
def about():
    return ""


def legacy():
    return ""


app.add_url_rule("/legacy", view_func=legacy, methods=["POST"])
app.register_blueprint(bp)
"#,
    );
    assert_eq!(
        routes(&scan),
        pairs(&[
            ("GET", "/users/{user_id}"),
            ("DELETE", "/users/{user_id}"),
            ("POST", "/users"),
            ("GET", "/about"),
            ("POST", "/legacy"),
        ])
    );
    assert_eq!(handler_of(&scan, "GET", "/about"), Some("about"));
    assert_eq!(handler_of(&scan, "POST", "/legacy"), Some("legacy"));
}

#[test]
fn test_django_urlpatterns() {
    let scan = scan(
        "django",
        r#"from django.urls import include, path, re_path
from . import views

urlpatterns = [
    path("", views.index, name="index"),
    path("articles/<int:year>/", views.year_archive),
    re_path(r"^articles/(?P<year>[0-9]{4})/(?P<slug>[\w-]+)/$", views.article_detail),
    path("api/", include("api.urls")),
    # path("old/", views.old),
]
"#,
    );
    assert_eq!(
        routes(&scan),
        pairs(&[
            ("ANY", "/"),
            ("ANY", "/articles/{year}"),
            ("ANY", "/articles/{year}/{slug}"),
        ])
    );
    assert_eq!(handler_of(&scan, "ANY", "/articles/{year}"), Some("views.year_archive"));
    let detail = &scan.endpoints[2];
    assert_eq!(detail.raw_path, "/articles/(?P<year>[0-9]{4})/(?P<slug>[\\w-]+)");
    assert_eq!(detail.line, 7);
}

#[test]
fn test_fastapi_dynamic_prefixes_and_docstrings() {
    let scan = scan(
        "fastapi",
        r#"from fastapi import APIRouter, FastAPI

app = FastAPI()
items = APIRouter(prefix=f"/v{ver}")
users = APIRouter(prefix="/users")


@items.get("/items")
def list_items():
    """List items.

    Example:
        @app.get("/docstring-example")
    """
    return []


@users.get("/{user_id}")
def get_user(user_id: int):
    return {}


app.include_router(users, prefix=f"/api/{version}")
"#,
    );
    assert_eq!(
        routes(&scan),
        pairs(&[("GET", "/v*/items"), ("GET", "/api/*/users/{user_id}")])
    );
    assert!(scan
        .endpoints
        .iter()
        .all(|e| e.confidence == Confidence::DynamicPathUnresolved));
}
