//! [`Database`] implementations of the in-memory backend.

use common::operations::{
    By, Commit, Delete, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;

use crate::{
    domain::{
        booking, car, contract, payment, user, Booking, Car, Contract,
        Payment, Review, User,
    },
    infra::{database, Database},
    read,
};

use super::{Access, InMemory, NonTx, Tx};

impl Database<Transact> for InMemory<NonTx> {
    type Ok = InMemory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(InMemory(Tx::from_non_tx(&self.0)))
    }
}

impl Database<Transact> for InMemory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for InMemory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.0.commit().await;
        Ok(())
    }
}

// Locks are modeled by the store-wide exclusivity of a transaction: taking
// one only forces the transaction to start.

impl Database<Lock<By<Car, car::Id>>> for InMemory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Car, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.0.with(|_| ()).await)
    }
}

impl Database<Lock<By<Booking, booking::Id>>> for InMemory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Booking, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.0.with(|_| ()).await)
    }
}

impl Database<Lock<By<Payment, payment::Id>>> for InMemory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Payment, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.0.with(|_| ()).await)
    }
}

impl<C: Access> Database<Select<By<Option<User>, user::Id>>> for InMemory<C> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.0.with(move |t| t.users.get(&id).cloned()).await)
    }
}

impl<C: Access> Database<Select<By<Option<User>, user::ChatId>>>
    for InMemory<C>
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::ChatId>>,
    ) -> Result<Self::Ok, Self::Err> {
        let chat_id = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                t.users.values().find(|u| u.chat_id == chat_id).cloned()
            })
            .await)
    }
}

impl<C: Access> Database<Insert<User>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(u): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.users.insert(u.id, u));
            })
            .await)
    }
}

impl<C: Access> Database<Update<User>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(u): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.users.insert(u.id, u));
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Option<Car>, car::Id>>> for InMemory<C> {
    type Ok = Option<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Car>, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.0.with(move |t| t.cars.get(&id).cloned()).await)
    }
}

impl<C: Access> Database<Select<By<Vec<Car>, read::car::AvailableIn>>>
    for InMemory<C>
{
    type Ok = Vec<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Car>, read::car::AvailableIn>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::car::AvailableIn(city) = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                let mut cars: Vec<_> = t
                    .cars
                    .values()
                    .filter(|c| c.available && c.city == city)
                    .cloned()
                    .collect();
                cars.sort_by(|a, b| {
                    (&a.brand, &a.model).cmp(&(&b.brand, &b.model))
                });
                cars
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Vec<car::City>, read::car::AvailableCities>>>
    for InMemory<C>
{
    type Ok = Vec<car::City>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(_): Select<By<Vec<car::City>, read::car::AvailableCities>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(|t| {
                let mut cities: Vec<_> = t
                    .cars
                    .values()
                    .filter(|c| c.available)
                    .map(|c| c.city.clone())
                    .collect();
                cities.sort();
                cities.dedup();
                cities
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Vec<Car>, read::car::OfOwner>>>
    for InMemory<C>
{
    type Ok = Vec<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Car>, read::car::OfOwner>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::car::OfOwner(owner_id) = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                let mut cars: Vec<_> = t
                    .cars
                    .values()
                    .filter(|c| c.owner_id == owner_id)
                    .cloned()
                    .collect();
                cars.sort_by(|a, b| {
                    (&a.brand, &a.model).cmp(&(&b.brand, &b.model))
                });
                cars
            })
            .await)
    }
}

impl<C: Access> Database<Insert<Car>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(car): Insert<Car>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.cars.insert(car.id, car));
            })
            .await)
    }
}

impl<C: Access> Database<Update<Car>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(car): Update<Car>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.cars.insert(car.id, car));
            })
            .await)
    }
}

impl<C: Access> Database<Delete<By<Car, car::Id>>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Car, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                drop(t.cars.remove(&id));
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Option<Booking>, booking::Id>>>
    for InMemory<C>
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.0.with(move |t| t.bookings.get(&id).cloned()).await)
    }
}

impl<C: Access> Database<Select<By<Vec<Booking>, read::booking::OfRenter>>>
    for InMemory<C>
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::OfRenter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::OfRenter { renter_id, status } = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                let mut bookings: Vec<_> = t
                    .bookings
                    .values()
                    .filter(|b| b.renter_id == renter_id && b.status == status)
                    .cloned()
                    .collect();
                bookings.sort_by_key(|b| b.created_at);
                bookings
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Vec<Booking>, read::booking::ActiveOfCar>>>
    for InMemory<C>
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::ActiveOfCar>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::ActiveOfCar(car_id) = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                let mut bookings: Vec<_> = t
                    .bookings
                    .values()
                    .filter(|b| {
                        b.car_id == car_id
                            && b.status != booking::Status::Cancelled
                    })
                    .cloned()
                    .collect();
                bookings.sort_by_key(|b| b.created_at);
                bookings
            })
            .await)
    }
}

impl<C: Access> Database<Insert<Booking>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(b): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.bookings.insert(b.id, b));
            })
            .await)
    }
}

impl<C: Access> Database<Update<Booking>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(b): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.bookings.insert(b.id, b));
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Option<Payment>, read::payment::Reference>>>
    for InMemory<C>
{
    type Ok = Option<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Payment>, read::payment::Reference>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::payment::Reference { id, method } = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                t.payments
                    .get(&id)
                    .filter(|p| p.method == method)
                    .cloned()
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Option<Payment>, read::payment::PendingOf>>>
    for InMemory<C>
{
    type Ok = Option<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Payment>, read::payment::PendingOf>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::payment::PendingOf(booking_id) = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                t.payments
                    .values()
                    .find(|p| {
                        p.booking_id == booking_id && !p.status.is_terminal()
                    })
                    .cloned()
            })
            .await)
    }
}

impl<C: Access> Database<Insert<Payment>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(p): Insert<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.payments.insert(p.id, p));
            })
            .await)
    }
}

impl<C: Access> Database<Update<Payment>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(p): Update<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.payments.insert(p.id, p));
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Option<Contract>, contract::Id>>>
    for InMemory<C>
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.0.with(move |t| t.contracts.get(&id).cloned()).await)
    }
}

impl<C: Access> Database<Select<By<Option<Contract>, booking::Id>>>
    for InMemory<C>
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let booking_id = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                t.contracts
                    .values()
                    .find(|c| c.booking_id == booking_id)
                    .cloned()
            })
            .await)
    }
}

impl<C: Access>
    Database<
        Select<By<Vec<(Contract, Booking)>, read::contract::SignedOfRenter>>,
    > for InMemory<C>
{
    type Ok = Vec<(Contract, Booking)>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<(Contract, Booking)>, read::contract::SignedOfRenter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::SignedOfRenter(renter_id) = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                let mut contracts: Vec<_> = t
                    .contracts
                    .values()
                    .filter(|c| c.signed)
                    .filter_map(|c| {
                        t.bookings
                            .get(&c.booking_id)
                            .filter(|b| b.renter_id == renter_id)
                            .map(|b| (c.clone(), b.clone()))
                    })
                    .collect();
                contracts.sort_by_key(|(_, b)| b.created_at);
                contracts
            })
            .await)
    }
}

impl<C: Access> Database<Insert<Contract>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(c): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.contracts.insert(c.id, c));
            })
            .await)
    }
}

impl<C: Access> Database<Update<Contract>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(c): Update<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.contracts.insert(c.id, c));
            })
            .await)
    }
}

impl<C: Access> Database<Delete<By<Contract, contract::Id>>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Contract, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .0
            .with(move |t| {
                drop(t.contracts.remove(&id));
            })
            .await)
    }
}

impl<C: Access> Database<Insert<Review>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(r): Insert<Review>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |t| {
                drop(t.reviews.insert(r.id, r));
            })
            .await)
    }
}
