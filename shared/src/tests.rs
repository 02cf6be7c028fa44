#[cfg(test)]
mod tests {
    use serde_json::json;
    use crate::error::{ErrorResponse, VoteError};
    use crate::models::*;
    use crate::validation::*;

    fn create_request(title: &str, choices: &[&str]) -> CreateVoteRequest {
        CreateVoteRequest {
            title: title.into(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_title_validation() {
        assert!(validate_title("Best pokemon").is_ok());
        assert_eq!(validate_title(""), Err(VoteError::EmptyTitle));
        assert_eq!(validate_title("   "), Err(VoteError::EmptyTitle));

        let long = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(matches!(validate_title(&long), Err(VoteError::InvalidRequest(_))));
        assert!(validate_title(&"x".repeat(MAX_TITLE_LENGTH)).is_ok());
    }

    #[test]
    fn test_create_vote_validation() {
        assert!(validate_create_vote(&create_request("Best pokemon", &["Pikachu", "Mew"])).is_ok());

        assert_eq!(
            validate_create_vote(&create_request("", &["Pikachu"])),
            Err(VoteError::EmptyTitle)
        );
        assert!(matches!(
            validate_create_vote(&create_request("Best pokemon", &[])),
            Err(VoteError::InvalidRequest(_))
        ));
        assert_eq!(
            validate_create_vote(&create_request("Best pokemon", &["Pikachu", ""])),
            Err(VoteError::EmptyTitle)
        );

        match validate_create_vote(&create_request("Best pokemon", &["Mew", "Pikachu", "Mew"])) {
            Err(VoteError::InvalidRequest(msg)) => assert!(msg.contains("Mew")),
            other => panic!("expected duplicate choice error, got {:?}", other),
        }

        let many: Vec<String> = (0..=MAX_CHOICES).map(|i| format!("choice {}", i)).collect();
        let request = CreateVoteRequest { title: "Too many".into(), choices: many };
        assert!(matches!(validate_create_vote(&request), Err(VoteError::InvalidRequest(_))));
    }

    #[test]
    fn test_update_validation() {
        assert!(validate_update(&TallyUpdate::increment("Best pokemon", "Pikachu")).is_ok());
        assert_eq!(
            validate_update(&TallyUpdate::increment("", "Pikachu")),
            Err(VoteError::EmptyTitle)
        );
        assert_eq!(
            validate_update(&TallyUpdate::new("Best pokemon", " ", -1)),
            Err(VoteError::EmptyTitle)
        );
    }

    #[test]
    fn test_update_request_defaults_to_single_increment() {
        let request: UpdateChoiceRequest =
            serde_json::from_value(json!({ "vote": "Best pokemon", "choice": "Pikachu" })).unwrap();
        let update = TallyUpdate::from(request);
        assert_eq!(update, TallyUpdate::increment("Best pokemon", "Pikachu"));

        let request: UpdateChoiceRequest =
            serde_json::from_value(json!({ "vote": "Best pokemon", "choice": "Mew", "delta": -3 })).unwrap();
        assert_eq!(request.delta, -3);
    }

    #[test]
    fn test_vote_response_shape() {
        let vote = Vote { id: 1, title: "Best pokemon".into() };
        let mut pikachu = Choice::new(1, "Pikachu");
        pikachu.count = 3;
        let response = VoteResponse::new(vote, vec![pikachu, Choice::new(1, "Mew")]);

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "vote_id": 1,
                "vote": "Best pokemon",
                "choices": [
                    { "choice": "Pikachu", "vote_count": 3 },
                    { "choice": "Mew", "vote_count": 0 }
                ]
            })
        );
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            VoteError::storage("connection reset"),
            VoteError::StorageFailure("connection reset".into())
        );

        let body = ErrorResponse::from(&VoteError::TitleNotFound);
        assert_eq!(body.error, "the title doesn't exist");
    }
}
