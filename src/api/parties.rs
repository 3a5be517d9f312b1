use rocket::{response::status::Created, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken},
            party::{PartyDescription, PartySpec},
        },
        mongodb::Id,
    },
    service::catalogue,
    store::Store,
};

pub fn routes() -> Vec<Route> {
    routes![get_parties, get_party, create_party, update_party, delete_party]
}

#[get("/admin/parties")]
async fn get_parties(
    _token: AuthToken<Admin>,
    store: Store,
) -> Result<Json<Vec<PartyDescription>>> {
    let parties = store.parties().await?;
    Ok(Json(parties.into_iter().map(Into::into).collect()))
}

#[get("/admin/parties/<party_id>")]
async fn get_party(
    _token: AuthToken<Admin>,
    party_id: Id,
    store: Store,
) -> Result<Json<PartyDescription>> {
    let party = store
        .party_by_id(party_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Party {party_id}")))?;
    Ok(Json(party.into()))
}

#[post("/admin/parties", data = "<spec>", format = "json")]
async fn create_party(
    _token: AuthToken<Admin>,
    spec: Json<PartySpec>,
    store: Store,
) -> Result<Created<Json<PartyDescription>>> {
    let party = catalogue::create_party(&*store, spec.0.try_into()?).await?;
    let location = format!("/admin/parties/{}", party.id);
    Ok(Created::new(location).body(Json(party.into())))
}

#[put("/admin/parties/<party_id>", data = "<spec>", format = "json")]
async fn update_party(
    _token: AuthToken<Admin>,
    party_id: Id,
    spec: Json<PartySpec>,
    store: Store,
) -> Result<Json<PartyDescription>> {
    let party = catalogue::update_party(&*store, party_id, spec.0.try_into()?).await?;
    Ok(Json(party.into()))
}

/// Parties that still have candidates are kept.
#[delete("/admin/parties/<party_id>")]
async fn delete_party(_token: AuthToken<Admin>, party_id: Id, store: Store) -> Result<()> {
    catalogue::delete_party(&*store, party_id).await
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use crate::api::common::examples::ballot;
    use crate::model::{common::party::PartyLevel, db::election::ElectionDetails};

    use super::*;

    async fn create(client: &Client, spec: &PartySpec) -> Status {
        client
            .post(uri!(create_party))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await
            .status()
    }

    #[backend_test(admin)]
    async fn party_lifecycle(client: Client) {
        assert_eq!(Status::Created, create(&client, &PartySpec::example()).await);

        let response = client.get(uri!(get_parties)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let parties: Vec<PartyDescription> = response.into_json().await.unwrap();
        assert_eq!(parties.len(), 1);
        let party = parties.into_iter().next().unwrap();
        assert_eq!(party.name, PartySpec::example().name);

        let spec = PartySpec {
            level: PartyLevel::Local,
            logo_url: None,
            ..PartySpec::example()
        };
        let response = client
            .put(uri!(update_party(*party.id)))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let updated: PartyDescription = response.into_json().await.unwrap();
        assert_eq!(updated.level, PartyLevel::Local);
        assert_eq!(updated.logo_url, None);

        let response = client.delete(uri!(delete_party(*party.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let response = client.get(uri!(get_party(*party.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn party_names_are_unique(client: Client) {
        assert_eq!(Status::Created, create(&client, &PartySpec::example()).await);
        assert_eq!(Status::Conflict, create(&client, &PartySpec::example()).await);

        let blank = PartySpec {
            name: " ".to_string(),
            ..PartySpec::example()
        };
        assert_eq!(Status::BadRequest, create(&client, &blank).await);
    }

    #[backend_test(admin)]
    async fn party_with_candidates_is_kept(client: Client, store: Store) {
        let current = ballot(&store, ElectionDetails::current_example()).await;
        let party = current.parties[0].id;

        let response = client.delete(uri!(delete_party(party))).dispatch().await;
        assert_eq!(Status::Conflict, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], "in_use");
        assert!(store.party_by_id(party).await.unwrap().is_some());
    }

    #[backend_test(voter)]
    async fn voters_cannot_manage_parties(client: Client) {
        assert_eq!(Status::Forbidden, create(&client, &PartySpec::example()).await);
    }
}
