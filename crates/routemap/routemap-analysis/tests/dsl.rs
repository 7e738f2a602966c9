//! Block-structured routing DSLs: Rails, Ktor, Laravel, Gin, Actix.

mod common;

use common::{handler_of, pairs, routes, scan};

const RAILS_ROUTES: &str = r#"Rails.application.routes.draw do
  root 'pages#home'
  get 'about', to: 'pages#about'

  resources :photos do
    member do
      get 'preview'
    end
    collection do
      get 'search'
    end
    resources :comments, only: [:index, :create]
  end

  namespace :admin do
    resources :users, only: [:index, :show]
  end

  resource :profile, except: [:destroy]
  match 'ping', to: 'health#ping', via: [:get, :post]

=begin
  get 'hidden'
=end
end
"#;

#[test]
fn test_rails_routes_file() {
    let scan = scan("rails", RAILS_ROUTES);
    assert_eq!(
        routes(&scan),
        pairs(&[
            ("GET", "/"),
            ("GET", "/about"),
            ("GET", "/photos"),
            ("POST", "/photos"),
            ("GET", "/photos/new"),
            ("GET", "/photos/{id}/edit"),
            ("GET", "/photos/{id}"),
            ("PATCH", "/photos/{id}"),
            ("PUT", "/photos/{id}"),
            ("DELETE", "/photos/{id}"),
            ("GET", "/photos/{id}/preview"),
            ("GET", "/photos/search"),
            ("GET", "/photos/{photo_id}/comments"),
            ("POST", "/photos/{photo_id}/comments"),
            ("GET", "/admin/users"),
            ("GET", "/admin/users/{id}"),
            ("POST", "/profile"),
            ("GET", "/profile/new"),
            ("GET", "/profile/edit"),
            ("GET", "/profile"),
            ("PATCH", "/profile"),
            ("PUT", "/profile"),
            ("GET", "/ping"),
            ("POST", "/ping"),
        ])
    );
    assert_eq!(handler_of(&scan, "GET", "/about"), Some("pages#about"));
    assert_eq!(handler_of(&scan, "GET", "/photos/{id}"), Some("photos#show"));
    assert_eq!(handler_of(&scan, "POST", "/ping"), Some("health#ping"));
}

#[test]
fn test_rails_resource_actions_share_declaration_order() {
    let scan = scan("rails", "resources :tags, except: [:new, :edit]\n");
    assert_eq!(scan.endpoints.len(), 6);
    assert!(scan.endpoints.iter().all(|e| e.declaration_order == scan.endpoints[0].declaration_order));
    assert!(scan.endpoints.iter().all(|e| e.line == 1));
}

#[test]
fn test_ktor_nested_routes() {
    let scan = scan(
        "ktor",
        r#"fun Application.module() {
    routing {
        get("/") {
            call.respondText("ok")
        }
        route("/api") {
            route("/users") {
                get {
                    call.respond(users)
                }
                get("/{id}") {
                    call.respond(user)
                }
                post {
                }
            }
        }
        // delete("/gone") { }
    }
}
"#,
    );
    assert_eq!(
        routes(&scan),
        pairs(&[
            ("GET", "/"),
            ("GET", "/api/users"),
            ("GET", "/api/users/{id}"),
            ("POST", "/api/users"),
        ])
    );
    assert_eq!(scan.endpoints[2].line, 11);
}

#[test]
fn test_laravel_groups_and_resources() {
    let scan = scan(
        "laravel",
        r#"<?php

use Illuminate\Support\Facades\Route;

Route::get('/', function () {
    return view('welcome');
});

Route::prefix('admin')->group(function () {
    Route::get('/users', [UserController::class, 'index']);
    Route::post('/users', [UserController::class, 'store']);
});

Route::group(['prefix' => 'api'], function () {
    Route::apiResource('photos', PhotoController::class);
});

Route::match(['get', 'post'], '/contact', [ContactController::class, 'handle']);
Route::view('/about', 'about');
Route::any('/fallback', FallbackController::class);
// Route::get('/commented', fn () => 1);
"#,
    );
    assert_eq!(
        routes(&scan),
        pairs(&[
            ("GET", "/"),
            ("GET", "/admin/users"),
            ("POST", "/admin/users"),
            ("GET", "/api/photos"),
            ("POST", "/api/photos"),
            ("GET", "/api/photos/{photo}"),
            ("PUT", "/api/photos/{photo}"),
            ("PATCH", "/api/photos/{photo}"),
            ("DELETE", "/api/photos/{photo}"),
            ("GET", "/contact"),
            ("POST", "/contact"),
            ("GET", "/about"),
            ("ANY", "/fallback"),
        ])
    );
    assert_eq!(handler_of(&scan, "ANY", "/fallback"), Some("FallbackController::class"));
}

#[test]
fn test_gin_groups() {
    let scan = scan(
        "gin",
        r#"package main

import "github.com/gin-gonic/gin"

func main() {
	r := gin.Default()
	r.GET("/ping", ping)

	v1 := r.Group("/api/v1")
	{
		v1.GET("/users/:id", getUser)
		v1.POST("/users", createUser)
		admin := v1.Group("/admin")
		admin.DELETE("/users/:id", deleteUser)
	}
	r.Handle("PATCH", "/legacy", legacy)
	r.Any("/proxy/*path", proxy)
	r.Run()
}
"#,
    );
    assert_eq!(
        routes(&scan),
        pairs(&[
            ("GET", "/ping"),
            ("GET", "/api/v1/users/{id}"),
            ("POST", "/api/v1/users"),
            ("DELETE", "/api/v1/admin/users/{id}"),
            ("PATCH", "/legacy"),
            ("ANY", "/proxy/{path}"),
        ])
    );
    assert_eq!(handler_of(&scan, "GET", "/api/v1/users/{id}"), Some("getUser"));
}

#[test]
fn test_actix_attribute_macros() {
    let scan = scan(
        "actix",
        r#"use actix_web::{get, post, route, web, HttpResponse, Responder};

#[get("/users/{id}")]
async fn get_user(path: web::Path<u32>) -> impl Responder {
    HttpResponse::Ok()
}

#[post("/users")]
async fn create_user() -> impl Responder {
    HttpResponse::Created()
}

#[route("/health", method = "GET", method = "HEAD")]
async fn health() -> impl Responder {
    HttpResponse::Ok()
}

// #[delete("/users/{id}")]
"#,
    );
    assert_eq!(
        routes(&scan),
        pairs(&[
            ("GET", "/users/{id}"),
            ("POST", "/users"),
            ("GET", "/health"),
            ("HEAD", "/health"),
        ])
    );
    assert_eq!(handler_of(&scan, "GET", "/users/{id}"), Some("get_user"));
}

#[test]
fn test_ktor_type_arguments_before_path() {
    let scan = scan(
        "ktor",
        r#"fun Application.locations() {
    routing {
        get<Loc>("/loc") {
            call.respond(call.receive<Loc>())
        }
        route("/typed") {
            post<CreateItem>("/items") {
                call.respond(HttpStatusCode.Created)
            }
        }
    }
}
"#,
    );
    assert_eq!(
        routes(&scan),
        pairs(&[("GET", "/loc"), ("POST", "/typed/items")])
    );
    assert_eq!(scan.endpoints[0].line, 3);
}
