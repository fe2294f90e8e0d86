use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns the specified elements of the list stored at `key`. The offsets `start` and `end` are
/// zero-based indexes and both are inclusive. Negative offsets count from the end of the list,
/// so -1 is the last element, -2 the penultimate and so on.
///
/// Out of range indexes don't produce an error: offsets that remain negative point at the first
/// element, an `end` past the list points at the last element, and `start` past `end` results in
/// an empty list.
///
/// Ref: <https://redis.io/docs/latest/commands/lrange/>
#[derive(Debug, PartialEq)]
pub struct Lrange {
    pub key: String,
    pub start: i64,
    pub end: i64,
}

impl Executable for Lrange {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let elements = store.lists().range(&self.key, self.start, self.end);

        Ok(Frame::Array(elements.into_iter().map(Frame::Bulk).collect()))
    }
}

impl TryFrom<&mut CommandParser> for Lrange {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let start = parser.next_integer()?;
        let end = parser.next_integer()?;

        Ok(Self { key, start, end })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::Command;
    use crate::store::lists::End;

    fn store_with_list() -> Store {
        let store = Store::new();
        store.lists().push(
            "mylist",
            vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")],
            End::Back,
        );
        store
    }

    async fn lrange(store: &Store, start: &'static str, end: &'static str) -> Frame {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("LRANGE")),
            Frame::Bulk(Bytes::from("mylist")),
            Frame::Bulk(Bytes::from(start)),
            Frame::Bulk(Bytes::from(end)),
        ]);
        let cmd = Command::try_from(frame).unwrap();
        cmd.exec(store.clone()).await.unwrap()
    }

    fn elements(values: &[&'static str]) -> Frame {
        Frame::Array(
            values
                .iter()
                .map(|v| Frame::Bulk(Bytes::from(*v)))
                .collect(),
        )
    }

    #[test]
    fn parse_lrange_command() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("LRANGE")),
            Frame::Bulk(Bytes::from("mylist")),
            Frame::Bulk(Bytes::from("-3")),
            Frame::Bulk(Bytes::from("2")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        assert_eq!(
            cmd,
            Command::Lrange(Lrange {
                key: "mylist".to_string(),
                start: -3,
                end: 2
            })
        );
    }

    #[test]
    fn non_integer_bounds() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("LRANGE")),
            Frame::Bulk(Bytes::from("mylist")),
            Frame::Bulk(Bytes::from("zero")),
            Frame::Bulk(Bytes::from("2")),
        ]);

        let err = Command::try_from(frame).unwrap_err();

        assert_eq!(err.to_string(), "ERR value is not an integer or out of range");
    }

    #[tokio::test]
    async fn using_positive_index() {
        let store = store_with_list();

        assert_eq!(lrange(&store, "0", "1").await, elements(&["a", "b"]));
        assert_eq!(lrange(&store, "0", "-1").await, elements(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn using_negative_index() {
        let store = store_with_list();

        assert_eq!(lrange(&store, "-2", "-1").await, elements(&["b", "c"]));
        assert_eq!(lrange(&store, "-100", "1").await, elements(&["a", "b"]));
    }

    #[tokio::test]
    async fn using_out_of_bound_index() {
        let store = store_with_list();

        assert_eq!(lrange(&store, "1", "100").await, elements(&["b", "c"]));
        assert_eq!(lrange(&store, "5", "10").await, elements(&[]));
        assert_eq!(lrange(&store, "2", "1").await, elements(&[]));
    }

    #[tokio::test]
    async fn missing_key() {
        let store = Store::new();

        assert_eq!(lrange(&store, "0", "-1").await, Frame::Array(vec![]));
    }
}
