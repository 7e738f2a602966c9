//! Express-style registrars: receivers, aliases, router variables, mounts.

mod common;

use common::{handler_of, pairs, routes, scan};
use routemap_analysis::Confidence;
use routemap_core::errors::ScanError;

#[test]
fn test_receiver_calls_and_parameters() {
    let scan = scan(
        "express",
        "const app = express();\n\
         app.get('/users', listUsers);\n\
         app.post('/users', createUser);\n\
         app.delete('/users/:id', removeUser);\n",
    );
    assert_eq!(
        routes(&scan),
        pairs(&[("GET", "/users"), ("POST", "/users"), ("DELETE", "/users/{id}")])
    );
    let removed = &scan.endpoints[2];
    assert_eq!(removed.raw_path, "/users/:id");
    assert_eq!(removed.line, 4);
    assert_eq!(removed.handler_name.as_deref(), Some("removeUser"));
    assert_eq!(removed.pattern, "express-verb");
}

#[test]
fn test_comments_and_strings_hide_declarations() {
    let scan = scan(
        "express",
        "// app.get('/commented', h);\n\
         /* app.post('/blocked', h); */\n\
         const doc = \"app.put('/quoted', h)\";\n\
         app.patch('/live', h);\n",
    );
    assert_eq!(routes(&scan), pairs(&[("PATCH", "/live")]));
}

#[test]
fn test_multiline_declaration_with_interior_comment() {
    let scan = scan(
        "express",
        "app.post(\n  '/login', // form submit\n  rateLimit,\n  handleLogin\n);\n",
    );
    assert_eq!(routes(&scan), pairs(&[("POST", "/login")]));
    assert_eq!(scan.endpoints[0].line, 1);
    assert_eq!(handler_of(&scan, "POST", "/login"), Some("handleLogin"));
}

#[test]
fn test_destructured_and_renamed_registrars() {
    let scan = scan(
        "express",
        "const { get, post: create } = router;\n\
         get('/items', listItems);\n\
         create('/items', addItem);\n",
    );
    assert_eq!(routes(&scan), pairs(&[("GET", "/items"), ("POST", "/items")]));
    assert_eq!(handler_of(&scan, "POST", "/items"), Some("addItem"));
}

#[test]
fn test_inner_declaration_shadows_alias() {
    let scan = scan(
        "express",
        "const { get } = router;\n\
         get('/outer', outer);\n\
         function lookup(cache) {\n\
           const get = (key) => cache[key];\n\
           get('/not-a-route');\n\
         }\n\
         get('/after', after);\n",
    );
    assert_eq!(routes(&scan), pairs(&[("GET", "/outer"), ("GET", "/after")]));
}

#[test]
fn test_nested_router_mounts() {
    let scan = scan(
        "express",
        "const api = express.Router();\n\
         const users = express.Router();\n\
         users.get('/:id', getUser);\n\
         api.use('/users', users);\n\
         app.use('/api/v1', api);\n\
         app.get('/health', health);\n",
    );
    assert_eq!(
        routes(&scan),
        pairs(&[("GET", "/api/v1/users/{id}"), ("GET", "/health")])
    );
}

#[test]
fn test_destructured_router_factory() {
    let scan = scan(
        "express",
        "const { Router } = require('express');\n\
         const admin = Router();\n\
         admin.put('/settings', save);\n\
         app.use('/admin', admin);\n",
    );
    assert_eq!(routes(&scan), pairs(&[("PUT", "/admin/settings")]));
}

#[test]
fn test_route_chain() {
    let scan = scan(
        "express",
        "router.route('/book')\n  .get(getBook)\n  .post(addBook)\n  .all(audit);\n",
    );
    assert_eq!(
        routes(&scan),
        pairs(&[("GET", "/book"), ("POST", "/book"), ("ANY", "/book")])
    );
    assert_eq!(handler_of(&scan, "POST", "/book"), Some("addBook"));
    assert_eq!(scan.endpoints[1].line, 3);
}

#[test]
fn test_array_of_paths() {
    let scan = scan("express", "app.get(['/a', '/b/:slug'], h);");
    assert_eq!(routes(&scan), pairs(&[("GET", "/a"), ("GET", "/b/{slug}")]));
    assert_eq!(scan.endpoints[0].declaration_order, scan.endpoints[1].declaration_order);
}

#[test]
fn test_dynamic_paths() {
    let scan = scan(
        "express",
        "app.get(`/files/${name}`, serve);\n\
         app.get('/static/' + dir, serve);\n\
         app.get(routePath, serve);\n",
    );
    assert_eq!(routes(&scan), pairs(&[("GET", "/files/*"), ("GET", "/static/*")]));
    assert!(scan
        .endpoints
        .iter()
        .all(|e| e.confidence == Confidence::DynamicPathUnresolved));
    assert_eq!(scan.discarded.len(), 1);
    assert!(scan
        .diagnostics
        .iter()
        .any(|d| matches!(d, ScanError::UnresolvedPath { line: 3, expression } if expression == "routePath")));
}

#[test]
fn test_type_arguments_on_calls() {
    let scan = scan(
        "express",
        "router.get<{ id: string }>('/typed/:id', getTyped);\n\
         app.post<Body, Reply<Item>>('/typed', (req, res) => res.json(req.body));\n",
    );
    assert_eq!(
        routes(&scan),
        pairs(&[("GET", "/typed/{id}"), ("POST", "/typed")])
    );
    assert_eq!(handler_of(&scan, "GET", "/typed/{id}"), Some("getTyped"));
}

#[test]
fn test_destructured_registrars_with_type_arguments() {
    let scan = scan(
        "express",
        r#"import express from 'express';
import { MessageResponse, ApiResponse, User } from './types';

const { get, post, put, delete: del, patch } = express.Router();

get<{}, MessageResponse>('/destructured', (_req, res) => {
  res.json({ message: 'Destructured GET route with TypeScript' });
});

post<{}, ApiResponse<{ id: number }>, { name: string }>('/destructured', (req, res) => {
  const { name } = req.body;
  res.status(201).json({ data: { id: Date.now() }, message: `Created with name: ${name}` });
});

put<{ id: string }, MessageResponse, { name: string }>('/destructured/:id', (req, res) => {
  res.json({ message: `Updated ${req.params.id}` });
});

del<{ id: string }, MessageResponse>('/destructured/:id', (req, res) => {
  res.json({ message: `Deleted item ${req.params.id}` });
});

patch<{ id: string }, ApiResponse<User>, Partial<User>>('/destructured/:id', (req, res) => {
  const updatedUser: User = { ...req.body };
  res.json({ data: updatedUser, success: true });
});

get<
  { category: string; id: string },
  ApiResponse<any>,
  {},
  { include?: string; format?: 'json' | 'xml' }
>('/destructured/:category/:id', (req, res) => {
  const { category, id } = req.params;
  res.json({ data: { category, id } });
});

export { get, post, put, del as delete, patch };
"#,
    );
    assert_eq!(
        routes(&scan),
        pairs(&[
            ("GET", "/destructured"),
            ("POST", "/destructured"),
            ("PUT", "/destructured/{id}"),
            ("DELETE", "/destructured/{id}"),
            ("PATCH", "/destructured/{id}"),
            ("GET", "/destructured/{category}/{id}"),
        ])
    );
    assert_eq!(scan.endpoints[5].line, 28);
}

#[test]
fn test_parameters_shadow_destructured_registrars() {
    let scan = scan(
        "express",
        "const { get } = router;\n\
         function f(get) {\n\
           get('/param-shadowed');\n\
         }\n\
         const g = (req, get) => {\n\
           get('/arrow-shadowed');\n\
         };\n\
         const k = get => {\n\
           get('/bare-arrow-shadowed');\n\
         };\n\
         get('/live', live);\n",
    );
    assert_eq!(routes(&scan), pairs(&[("GET", "/live")]));
}

#[test]
fn test_dynamic_mount_prefix_lowers_confidence() {
    let scan = scan(
        "express",
        "const r = express.Router();\n\
         r.get('/items', list);\n\
         app.use(`/v${n}`, r);\n\
         const s = express.Router();\n\
         s.get('/things', list);\n\
         app.use(base, s);\n\
         app.get('/health', health);\n",
    );
    assert_eq!(
        routes(&scan),
        pairs(&[("GET", "/v*/items"), ("GET", "/*/things"), ("GET", "/health")])
    );
    assert_eq!(scan.endpoints[0].confidence, Confidence::DynamicPathUnresolved);
    assert_eq!(scan.endpoints[1].confidence, Confidence::DynamicPathUnresolved);
    assert_eq!(scan.endpoints[2].confidence, Confidence::Static);
    assert!(scan
        .diagnostics
        .iter()
        .any(|d| matches!(d, ScanError::UnresolvedPath { line: 6, expression } if expression == "base")));
}

#[test]
fn test_unterminated_declaration_marks_partial() {
    let scan = scan("express", "app.get('/a', h);\napp.get('/b', (req, res) => {\n");
    assert_eq!(routes(&scan), pairs(&[("GET", "/a")]));
    assert!(scan.partial);
    assert!(scan
        .diagnostics
        .iter()
        .any(|d| matches!(d, ScanError::AssemblyBudgetExceeded { line: 2, .. })));
}

#[test]
fn test_jsdoc_examples_are_not_declarations() {
    let scan = scan(
        "express",
        "/**\n\
          * Mounts the user routes.\n\
          *\n\
          * @example\n\
          * app.get('/users/:id', getUser);\n\
          * router.post('/users', createUser);\n\
          */\n\
         function mountUsers(app) {}\n",
    );
    assert!(scan.endpoints.is_empty());
}

#[test]
fn test_multiline_layout_matches_single_line() {
    let single = scan("express", "app.put('/orders/:id', auth, updateOrder);\n");
    let multi = scan(
        "express",
        "app.put(\n\
           '/orders/:id',\n\
         \n\
           // requires a session\n\
           auth,\n\
           updateOrder\n\
         );\n",
    );
    assert_eq!(routes(&multi), routes(&single));
    assert_eq!(multi.endpoints[0].handler_name, single.endpoints[0].handler_name);
    assert_eq!(multi.endpoints[0].confidence, single.endpoints[0].confidence);
}
