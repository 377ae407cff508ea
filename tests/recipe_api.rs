mod support;

use recipe_api::schema::AssociationKind;
use serde_json::json;
use support::{authed, json, names, TestApp};

const RECIPES_URL: &str = "/api/recipe/recipes/";

fn detail_url(id: i32) -> String {
    format!("/api/recipe/recipes/{id}/")
}

#[tokio::test]
async fn auth_required() {
    let app = TestApp::new();

    let res = app
        .send(warp::test::request().method("GET").path(RECIPES_URL))
        .await;

    assert_eq!(res.status(), 401);
    assert_eq!(json(&res)["code"], 401);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = TestApp::new();
    let (_, token) = app.user("test@example.com").await;

    let res = app
        .send(
            warp::test::request()
                .method("GET")
                .path(RECIPES_URL)
                .header("cookie", format!("session={token}")),
        )
        .await;

    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn retrieve_recipes_newest_first() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let first = app.recipe(&user, "First").await;
    let second = app.recipe(&user, "Second").await;

    let res = app.send(authed("GET", RECIPES_URL, &token)).await;

    assert_eq!(res.status(), 200);
    let body = json(&res);
    assert_eq!(body[0]["id"], second.recipe.id);
    assert_eq!(body[1]["id"], first.recipe.id);
    assert_eq!(body[0]["price"], "5.25");
    assert!(body[0].get("description").is_none());
}

#[tokio::test]
async fn recipe_list_limited_to_user() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let (other, _) = app.user("other@example.com").await;
    app.recipe(&other, "Theirs").await;
    let mine = app.recipe(&user, "Mine").await;

    let res = app.send(authed("GET", RECIPES_URL, &token)).await;

    let body = json(&res);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], mine.recipe.id);
}

#[tokio::test]
async fn get_recipe_detail() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe_with(&user, "Pongal", &["Indian"], &["Rice"]).await;

    let res = app
        .send(authed("GET", &detail_url(recipe.recipe.id), &token))
        .await;

    assert_eq!(res.status(), 200);
    assert_eq!(json(&res), serde_json::to_value(&recipe).unwrap());
    assert_eq!(json(&res)["description"], "Sample recipe description.");
}

#[tokio::test]
async fn create_recipe() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;

    let res = app
        .send(authed("POST", RECIPES_URL, &token).json(&json!({
            "title": "Sample Recipe",
            "time_minutes": 30,
            "price": "5.99",
        })))
        .await;

    assert_eq!(res.status(), 201);
    let body = json(&res);
    let id = body["id"].as_i64().unwrap() as i32;
    let stored = app.store_recipe(user.id, id).await;
    assert_eq!(stored.recipe.title, "Sample Recipe");
    assert_eq!(stored.recipe.time_minutes, 30);
    assert_eq!(stored.recipe.price, 5.99);
    assert_eq!(body["tags"], json!([]));
}

#[tokio::test]
async fn create_recipe_from_form_body() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;

    let res = app
        .send(
            authed("POST", RECIPES_URL, &token)
                .header("content-type", "application/x-www-form-urlencoded")
                .body("title=Sample+Recipe&time_minutes=30&price=5.99"),
        )
        .await;

    assert_eq!(res.status(), 201);
    let id = json(&res)["id"].as_i64().unwrap() as i32;
    let stored = app.store_recipe(user.id, id).await;
    assert_eq!(stored.recipe.title, "Sample Recipe");
    assert_eq!(stored.recipe.time_minutes, 30);
    assert_eq!(stored.recipe.price, 5.99);
}

#[tokio::test]
async fn numeric_strings_are_accepted() {
    let app = TestApp::new();
    let (_, token) = app.user("test@example.com").await;

    let res = app
        .send(authed("POST", RECIPES_URL, &token).json(&json!({
            "title": "Sample Recipe",
            "time_minutes": "30",
            "price": "5.99",
        })))
        .await;

    assert_eq!(res.status(), 201);
    assert_eq!(json(&res)["time_minutes"], 30);
}

#[tokio::test]
async fn partial_update_from_form_body() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app
        .recipe_with(&user, "Sample Recipe Title", &["Dinner"], &[])
        .await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .header("content-type", "application/x-www-form-urlencoded")
                .body("title=New+Recipe+Title&time_minutes=10"),
        )
        .await;

    assert_eq!(res.status(), 200);
    let stored = app.store_recipe(user.id, recipe.recipe.id).await;
    assert_eq!(stored.recipe.title, "New Recipe Title");
    assert_eq!(stored.recipe.time_minutes, 10);
    assert_eq!(stored.recipe.link, recipe.recipe.link);
    assert_eq!(stored.tags, recipe.tags);
}

#[tokio::test]
async fn create_recipe_requires_title() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;

    let res = app
        .send(authed("POST", RECIPES_URL, &token).json(&json!({
            "time_minutes": 30,
            "price": 5.99,
        })))
        .await;

    assert_eq!(res.status(), 400);
    assert_eq!(json(&res)["error"], "title: This field is required.");
    assert!(app.list(user.id).await.is_empty());
}

#[tokio::test]
async fn partial_update() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe(&user, "Sample Recipe Title").await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "title": "New Recipe Title" })),
        )
        .await;

    assert_eq!(res.status(), 200);
    let stored = app.store_recipe(user.id, recipe.recipe.id).await;
    assert_eq!(stored.recipe.title, "New Recipe Title");
    assert_eq!(stored.recipe.link, "http://example.com/recipe.pdf");
}

#[tokio::test]
async fn full_update() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe(&user, "Sample Recipe Title").await;

    let res = app
        .send(
            authed("PUT", &detail_url(recipe.recipe.id), &token).json(&json!({
                "title": "New Recipe Title",
                "link": "http://example.com/new-recipe.pdf",
                "time_minutes": 10,
                "price": "2.50",
                "description": "New recipe description.",
            })),
        )
        .await;

    assert_eq!(res.status(), 200);
    let stored = app.store_recipe(user.id, recipe.recipe.id).await;
    assert_eq!(stored.recipe.title, "New Recipe Title");
    assert_eq!(stored.recipe.link, "http://example.com/new-recipe.pdf");
    assert_eq!(stored.recipe.time_minutes, 10);
    assert_eq!(stored.recipe.price, 2.5);
    assert_eq!(stored.recipe.description, "New recipe description.");
}

#[tokio::test]
async fn full_update_requires_scalar_fields() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe(&user, "Sample Recipe Title").await;

    let res = app
        .send(
            authed("PUT", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "title": "Only a title" })),
        )
        .await;

    assert_eq!(res.status(), 400);
    let stored = app.store_recipe(user.id, recipe.recipe.id).await;
    assert_eq!(stored.recipe.title, "Sample Recipe Title");
}

#[tokio::test]
async fn owner_cannot_be_changed() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let (other, _) = app.user("user2@example.com").await;
    let recipe = app.recipe(&user, "Mine").await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "id": other.id, "user": other.id })),
        )
        .await;

    assert_eq!(res.status(), 200);
    app.store_recipe(user.id, recipe.recipe.id).await;
}

#[tokio::test]
async fn delete_recipe() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe(&user, "Doomed").await;

    let res = app
        .send(authed("DELETE", &detail_url(recipe.recipe.id), &token))
        .await;

    assert_eq!(res.status(), 204);
    assert!(app.list(user.id).await.is_empty());
}

#[tokio::test]
async fn other_users_recipe_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.user("test@example.com").await;
    let (other, _) = app.user("user2@example.com").await;
    let recipe = app.recipe(&other, "Theirs").await;

    for method in ["GET", "DELETE"] {
        let res = app
            .send(authed(method, &detail_url(recipe.recipe.id), &token))
            .await;
        assert_eq!(res.status(), 404);
    }
    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "tags": [{ "name": "Stolen" }] })),
        )
        .await;

    assert_eq!(res.status(), 404);
    assert_eq!(app.list(other.id).await.len(), 1);
    assert!(app.store_recipe(other.id, recipe.recipe.id).await.tags.is_empty());
}

#[tokio::test]
async fn unknown_recipe_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.user("test@example.com").await;

    let res = app.send(authed("GET", &detail_url(999), &token)).await;

    assert_eq!(res.status(), 404);
    assert_eq!(json(&res), json!({ "code": 404, "error": "Not found" }));
}

#[tokio::test]
async fn create_recipe_with_new_tags() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;

    let res = app
        .send(authed("POST", RECIPES_URL, &token).json(&json!({
            "title": "Thai Prawn Curry",
            "time_minutes": 30,
            "price": "2.50",
            "tags": [{ "name": "Thai" }, { "name": "Dinner" }],
        })))
        .await;

    assert_eq!(res.status(), 201);
    assert_eq!(names(&json(&res)["tags"]), vec!["Dinner", "Thai"]);
    assert_eq!(app.named_list(user.id, AssociationKind::Tag).await.len(), 2);
}

#[tokio::test]
async fn create_recipe_with_existing_tags() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let indian = app.named(&user, AssociationKind::Tag, "Indian").await;

    let res = app
        .send(authed("POST", RECIPES_URL, &token).json(&json!({
            "title": "Pongal",
            "time_minutes": 60,
            "price": "4.50",
            "tags": [{ "name": "Indian" }, { "name": "Breakfast" }],
        })))
        .await;

    assert_eq!(res.status(), 201);
    let body = json(&res);
    assert_eq!(names(&body["tags"]), vec!["Breakfast", "Indian"]);
    assert!(body["tags"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["id"] == indian.id));
    assert_eq!(app.named_list(user.id, AssociationKind::Tag).await.len(), 2);
}

#[tokio::test]
async fn duplicate_names_in_request_collapse() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;

    let res = app
        .send(authed("POST", RECIPES_URL, &token).json(&json!({
            "title": "Soup",
            "time_minutes": 10,
            "price": 1,
            "ingredients": [{ "name": "Salt" }, { "name": "Salt" }],
        })))
        .await;

    assert_eq!(res.status(), 201);
    assert_eq!(names(&json(&res)["ingredients"]), vec!["Salt"]);
    assert_eq!(
        app.named_list(user.id, AssociationKind::Ingredient).await.len(),
        1
    );
}

#[tokio::test]
async fn same_tag_name_stays_per_user() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let (other, _) = app.user("other@example.com").await;
    let theirs = app.named(&other, AssociationKind::Tag, "Vegan").await;

    let res = app
        .send(authed("POST", RECIPES_URL, &token).json(&json!({
            "title": "Salad",
            "time_minutes": 5,
            "price": "3.00",
            "tags": [{ "name": "Vegan" }],
        })))
        .await;

    assert_eq!(res.status(), 201);
    assert_ne!(json(&res)["tags"][0]["id"], theirs.id);
    assert_eq!(app.named_list(user.id, AssociationKind::Tag).await.len(), 1);
    assert_eq!(app.named_list(other.id, AssociationKind::Tag).await.len(), 1);
}

#[tokio::test]
async fn create_tag_on_update() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe(&user, "Sample").await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "tags": [{ "name": "Lunch" }] })),
        )
        .await;

    assert_eq!(res.status(), 200);
    let stored = app.store_recipe(user.id, recipe.recipe.id).await;
    assert_eq!(stored.tags.len(), 1);
    assert_eq!(stored.tags[0].name, "Lunch");
}

#[tokio::test]
async fn update_assigns_existing_tag() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe_with(&user, "Sample", &["Indian"], &[]).await;
    let breakfast = app.named(&user, AssociationKind::Tag, "Breakfast").await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "tags": [{ "name": "Breakfast" }] })),
        )
        .await;

    assert_eq!(res.status(), 200);
    let stored = app.store_recipe(user.id, recipe.recipe.id).await;
    assert_eq!(stored.tags, vec![breakfast]);
    assert_eq!(app.named_list(user.id, AssociationKind::Tag).await.len(), 2);
}

#[tokio::test]
async fn clear_recipe_tags() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe_with(&user, "Sample", &["Breakfast"], &[]).await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "tags": [] })),
        )
        .await;

    assert_eq!(res.status(), 200);
    assert!(app.store_recipe(user.id, recipe.recipe.id).await.tags.is_empty());
    assert_eq!(app.named_list(user.id, AssociationKind::Tag).await.len(), 1);
}

#[tokio::test]
async fn omitted_associations_are_unchanged() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app
        .recipe_with(&user, "Sample", &["Dinner"], &["Salt"])
        .await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "title": "Renamed", "tags": null })),
        )
        .await;

    assert_eq!(res.status(), 200);
    let stored = app.store_recipe(user.id, recipe.recipe.id).await;
    assert_eq!(stored.tags, recipe.tags);
    assert_eq!(stored.ingredients, recipe.ingredients);
}

#[tokio::test]
async fn same_tags_twice_create_nothing_new() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe(&user, "Sample").await;
    let payload = json!({ "tags": [{ "name": "Lunch" }, { "name": "Quick" }] });

    for _ in 0..2 {
        let res = app
            .send(authed("PATCH", &detail_url(recipe.recipe.id), &token).json(&payload))
            .await;
        assert_eq!(res.status(), 200);
    }

    assert_eq!(app.named_list(user.id, AssociationKind::Tag).await.len(), 2);
    assert_eq!(app.store_recipe(user.id, recipe.recipe.id).await.tags.len(), 2);
}

#[tokio::test]
async fn malformed_descriptor_writes_nothing() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe_with(&user, "Sample", &["Dinner"], &[]).await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "title": "Changed", "tags": [{ "label": "Lunch" }] })),
        )
        .await;

    assert_eq!(res.status(), 400);
    let stored = app.store_recipe(user.id, recipe.recipe.id).await;
    assert_eq!(stored.recipe.title, "Sample");
    assert_eq!(stored.tags, recipe.tags);
}

#[tokio::test]
async fn blank_tag_name_is_rejected() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe(&user, "Sample").await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "tags": [{ "name": "   " }] })),
        )
        .await;

    assert_eq!(res.status(), 400);
    assert!(app.named_list(user.id, AssociationKind::Tag).await.is_empty());
}

#[tokio::test]
async fn create_recipe_with_existing_ingredients() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let salt = app.named(&user, AssociationKind::Ingredient, "Salt").await;

    let res = app
        .send(authed("POST", RECIPES_URL, &token).json(&json!({
            "title": "Pongal",
            "time_minutes": 60,
            "price": "4.50",
            "ingredients": [{ "name": "Salt" }, { "name": "Oregano" }],
        })))
        .await;

    assert_eq!(res.status(), 201);
    let body = json(&res);
    assert_eq!(names(&body["ingredients"]), vec!["Oregano", "Salt"]);
    assert!(body["ingredients"]
        .as_array()
        .unwrap()
        .iter()
        .any(|i| i["id"] == salt.id));
}

#[tokio::test]
async fn update_assigns_existing_ingredient() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe_with(&user, "Sample", &[], &["Lemon"]).await;
    let sirup = app.named(&user, AssociationKind::Ingredient, "Sirup").await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "ingredients": [{ "name": "Sirup" }] })),
        )
        .await;

    assert_eq!(res.status(), 200);
    assert_eq!(
        app.store_recipe(user.id, recipe.recipe.id).await.ingredients,
        vec![sirup]
    );
}

#[tokio::test]
async fn clear_recipe_ingredients() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let recipe = app.recipe_with(&user, "Sample", &[], &["Sugar"]).await;

    let res = app
        .send(
            authed("PATCH", &detail_url(recipe.recipe.id), &token)
                .json(&json!({ "ingredients": [] })),
        )
        .await;

    assert_eq!(res.status(), 200);
    assert!(app
        .store_recipe(user.id, recipe.recipe.id)
        .await
        .ingredients
        .is_empty());
}

#[tokio::test]
async fn filter_by_tags() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let r1 = app.recipe_with(&user, "Thai Vegetable Curry", &["Vegan"], &[]).await;
    let r2 = app
        .recipe_with(&user, "Aubergine with Tahini", &["Vegetarian"], &[])
        .await;
    let r3 = app.recipe(&user, "Fish and chips").await;

    let url = format!(
        "{RECIPES_URL}?tags={},{}",
        r1.tags[0].id, r2.tags[0].id
    );
    let res = app.send(authed("GET", &url, &token)).await;

    assert_eq!(res.status(), 200);
    let ids: Vec<i64> = json(&res)
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![r2.recipe.id as i64, r1.recipe.id as i64]);
    assert!(!ids.contains(&(r3.recipe.id as i64)));
}

#[tokio::test]
async fn filter_by_ingredients() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    let r1 = app
        .recipe_with(&user, "Posh Beans on Toast", &[], &["Feta Cheese"])
        .await;
    let r2 = app
        .recipe_with(&user, "Chicken Cacciatore", &[], &["Chicken"])
        .await;
    app.recipe(&user, "Red Lentil Daal").await;

    let url = format!(
        "{RECIPES_URL}?ingredients={},{}",
        r1.ingredients[0].id, r2.ingredients[0].id
    );
    let res = app.send(authed("GET", &url, &token)).await;

    assert_eq!(res.status(), 200);
    assert_eq!(json(&res).as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_filter_lists_everything() {
    let app = TestApp::new();
    let (user, token) = app.user("test@example.com").await;
    app.recipe_with(&user, "Thai Vegetable Curry", &["Vegan"], &[]).await;
    app.recipe(&user, "Fish and chips").await;

    for query in ["?tags=", "?tags=,", "?ingredients=&tags="] {
        let res = app
            .send(authed("GET", &format!("{RECIPES_URL}{query}"), &token))
            .await;

        assert_eq!(res.status(), 200);
        assert_eq!(json(&res).as_array().unwrap().len(), 2, "query {query}");
    }
}

#[tokio::test]
async fn filter_ids_must_be_numbers() {
    let app = TestApp::new();
    let (_, token) = app.user("test@example.com").await;

    let res = app
        .send(authed("GET", &format!("{RECIPES_URL}?tags=1,abc"), &token))
        .await;

    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.user("test@example.com").await;

    let res = app.send(authed("DELETE", RECIPES_URL, &token)).await;

    assert_eq!(res.status(), 405);
}
