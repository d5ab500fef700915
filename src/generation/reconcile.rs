use crate::models::question::Question;

/// Keeps at most `closed_quota` closed and `open_quota` open questions,
/// preserving the model's order. Candidates past a full bucket are dropped;
/// under-delivery is not an error here.
pub fn select_questions(
    candidates: Vec<Question>,
    closed_quota: usize,
    open_quota: usize,
) -> Vec<Question> {
    let mut closed_taken = 0;
    let mut open_taken = 0;
    let mut selected = Vec::with_capacity(closed_quota + open_quota);

    for question in candidates {
        if closed_taken >= closed_quota && open_taken >= open_quota {
            break;
        }
        if question.is_closed() {
            if closed_taken < closed_quota {
                closed_taken += 1;
                selected.push(question);
            }
        } else if open_taken < open_quota {
            open_taken += 1;
            selected.push(question);
        }
    }

    selected
}
